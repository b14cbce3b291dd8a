//! LAN discovery: who answers a broadcast wildcard query, and what they are called.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use maybe_async::maybe_async;
use netbios_msg::{NameSuffix, NetBiosName, NodeStatus, NsPacket};
use time::OffsetDateTime;

use crate::{NameService, Result};

/// A host found on the local network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsEntry {
    pub name: String,
    /// Workgroup or domain.
    pub group: Option<String>,
    pub suffix: NameSuffix,
    pub address: Ipv4Addr,
    pub mac: Option<[u8; 6]>,
    pub last_seen: OffsetDateTime,
}

impl NsEntry {
    /// Builds an entry from a node's name table; `None` if it registers no host name.
    pub fn from_node_status(
        address: Ipv4Addr,
        status: &NodeStatus,
        last_seen: OffsetDateTime,
    ) -> Option<NsEntry> {
        let host = status.host_name()?;
        Some(NsEntry {
            name: host.name(),
            group: status.group_name().map(NetBiosName::name),
            suffix: host.suffix(),
            address,
            mac: status.mac_address(),
            last_seen,
        })
    }

    /// The MAC address as `aa:bb:cc:dd:ee:ff`.
    pub fn mac_string(&self) -> Option<String> {
        self.mac.map(|mac| {
            mac.iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(":")
        })
    }
}

impl std::fmt::Display for NsEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<15} {:<16}", self.address, self.name)?;
        if let Some(group) = &self.group {
            write!(f, " {group:<16}")?;
        }
        if let Some(mac) = self.mac_string() {
            write!(f, " {mac}")?;
        }
        Ok(())
    }
}

#[maybe_async]
impl NameService {
    /// Broadcasts a wildcard name query, waits `wait` for answers, then asks
    /// every responder for its node status.
    ///
    /// Responders whose node status cannot be read are skipped.
    pub async fn discover(&self, wait: Duration) -> Result<Vec<NsEntry>> {
        self.capabilities().require_sockets()?;
        let request = NsPacket::name_query(rand::random(), &NetBiosName::wildcard(), true);
        let responses = self.collect(&request, wait).await?;

        let mut responders: Vec<Ipv4Addr> = Vec::new();
        for (from, _) in responses {
            if let IpAddr::V4(address) = from.ip() {
                if !responders.contains(&address) {
                    responders.push(address);
                }
            }
        }
        log::debug!("{} host(s) answered the discovery broadcast", responders.len());

        let mut entries = Vec::with_capacity(responders.len());
        for address in responders {
            let status = match self.node_status(address).await {
                Ok(status) => status,
                Err(e) => {
                    log::warn!("Skipping {address}: node status failed: {e}");
                    continue;
                }
            };
            match NsEntry::from_node_status(address, &status, OffsetDateTime::now_utc()) {
                Some(entry) => entries.push(entry),
                None => log::warn!("Skipping {address}: no host name in its name table"),
            }
        }
        Ok(entries)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    Added(NsEntry),
    Removed(NsEntry),
}

/// Tracks the hosts on the network across repeated discoveries.
#[derive(Debug)]
pub struct Discoverer {
    entries: HashMap<Ipv4Addr, NsEntry>,
    wait: Duration,
    expiry: Duration,
}

impl Discoverer {
    /// `wait` is how long each poll listens for answers;
    /// hosts unseen for longer than `expiry` are removed.
    pub fn new(wait: Duration, expiry: Duration) -> Self {
        Discoverer {
            entries: HashMap::new(),
            wait,
            expiry,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &NsEntry> {
        self.entries.values()
    }

    /// Folds a discovery round seen at `now` into the table.
    pub fn merge(&mut self, seen: Vec<NsEntry>, now: OffsetDateTime) -> Vec<DiscoveryEvent> {
        let mut events = Vec::new();
        for entry in seen {
            match self.entries.get_mut(&entry.address) {
                Some(known) if known.name == entry.name && known.mac == entry.mac => {
                    known.last_seen = entry.last_seen;
                    known.group = entry.group;
                }
                Some(known) => {
                    // Same address, different host.
                    events.push(DiscoveryEvent::Removed(known.clone()));
                    *known = entry.clone();
                    events.push(DiscoveryEvent::Added(entry));
                }
                None => {
                    self.entries.insert(entry.address, entry.clone());
                    events.push(DiscoveryEvent::Added(entry));
                }
            }
        }

        let expiry = self.expiry;
        let expired: Vec<Ipv4Addr> = self
            .entries
            .values()
            .filter(|e| now - e.last_seen > expiry)
            .map(|e| e.address)
            .collect();
        for address in expired {
            if let Some(entry) = self.entries.remove(&address) {
                events.push(DiscoveryEvent::Removed(entry));
            }
        }
        events
    }

    /// Runs one discovery round and reports what changed.
    #[maybe_async]
    pub async fn poll(&mut self, name_service: &NameService) -> Result<Vec<DiscoveryEvent>> {
        let seen = name_service.discover(self.wait).await?;
        Ok(self.merge(seen, OffsetDateTime::now_utc()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netbios_msg::{NodeName, NodeNameFlags};
    use time::macros::datetime;

    fn entry(address: [u8; 4], name: &str, last_seen: OffsetDateTime) -> NsEntry {
        NsEntry {
            name: name.to_string(),
            group: Some("WORKGROUP".to_string()),
            suffix: NameSuffix::FILE_SERVER,
            address: address.into(),
            mac: None,
            last_seen,
        }
    }

    #[test]
    fn test_entry_from_node_status() {
        let node_name = |name: &str, suffix: NameSuffix, group: bool| NodeName {
            name: NetBiosName::new(name, suffix).unwrap(),
            flags: NodeNameFlags::new().with_active(true).with_group(group),
        };
        let status = NodeStatus {
            names: vec![
                node_name("NAS", NameSuffix::WORKSTATION, false),
                node_name("HOME", NameSuffix::WORKSTATION, true),
                node_name("NAS", NameSuffix::FILE_SERVER, false),
            ],
            unit_id: [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
            statistics: vec![],
        };
        let now = datetime!(2024-01-01 12:00 UTC);
        let entry = NsEntry::from_node_status([10, 0, 0, 2].into(), &status, now).unwrap();
        assert_eq!(entry.name, "NAS");
        assert_eq!(entry.suffix, NameSuffix::FILE_SERVER);
        assert_eq!(entry.group.as_deref(), Some("HOME"));
        assert_eq!(entry.mac_string().as_deref(), Some("de:ad:be:ef:00:01"));

        let empty = NodeStatus {
            names: vec![],
            unit_id: [0; 6],
            statistics: vec![],
        };
        assert!(NsEntry::from_node_status([10, 0, 0, 2].into(), &empty, now).is_none());
    }

    #[test]
    fn test_merge_added_refreshed_removed() {
        let t0 = datetime!(2024-01-01 12:00 UTC);
        let t1 = datetime!(2024-01-01 12:00:30 UTC);
        let t2 = datetime!(2024-01-01 12:02 UTC);
        let mut discoverer = Discoverer::new(Duration::from_secs(1), Duration::from_secs(60));

        let events = discoverer.merge(
            vec![entry([10, 0, 0, 2], "A", t0), entry([10, 0, 0, 3], "B", t0)],
            t0,
        );
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, DiscoveryEvent::Added(_))));

        // Seen again: no event, but refreshed.
        let events = discoverer.merge(vec![entry([10, 0, 0, 2], "A", t1)], t1);
        assert!(events.is_empty());

        // B was last seen at t0 and expires.
        let events = discoverer.merge(vec![entry([10, 0, 0, 2], "A", t2)], t2);
        assert_eq!(
            events,
            vec![DiscoveryEvent::Removed(entry([10, 0, 0, 3], "B", t0))]
        );
        assert_eq!(discoverer.entries().count(), 1);
    }

    #[test]
    fn test_merge_address_taken_over() {
        let t0 = datetime!(2024-01-01 12:00 UTC);
        let mut discoverer = Discoverer::new(Duration::from_secs(1), Duration::from_secs(60));
        discoverer.merge(vec![entry([10, 0, 0, 2], "OLD", t0)], t0);
        let events = discoverer.merge(vec![entry([10, 0, 0, 2], "NEW", t0)], t0);
        assert_eq!(
            events,
            vec![
                DiscoveryEvent::Removed(entry([10, 0, 0, 2], "OLD", t0)),
                DiscoveryEvent::Added(entry([10, 0, 0, 2], "NEW", t0)),
            ]
        );
    }
}
