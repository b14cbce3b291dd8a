//! NetBIOS name service client: name queries, node status and the name cache.
//!
//! Every query is sent from its own ephemeral UDP socket with a random
//! transaction id, so a [`NameService`] may be shared and queried concurrently.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use binrw::{BinRead, BinWrite, io::Cursor};
use maybe_async::maybe_async;
use netbios_msg::{NameSuffix, NetBiosName, NodeStatus, NsPacket, Rcode, RecordType};
use netbios_transport::{TransportError, UdpTransport};
use time::OffsetDateTime;

use crate::{Error, NameServiceConfig, PlatformCapabilities, Result};

/// Receive buffer size; node status answers may exceed the 576 bytes we send.
const RECEIVE_BUFFER_SIZE: usize = 4096;

struct CacheEntry {
    address: Ipv4Addr,
    expires: OffsetDateTime,
}

pub struct NameService {
    config: NameServiceConfig,
    capabilities: PlatformCapabilities,
    cache: Mutex<HashMap<NetBiosName, CacheEntry>>,
}

impl NameService {
    pub fn new(config: NameServiceConfig, capabilities: PlatformCapabilities) -> Self {
        NameService {
            config,
            capabilities,
            cache: Default::default(),
        }
    }

    pub fn config(&self) -> &NameServiceConfig {
        &self.config
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    /// Drops every cached name.
    pub fn cache_clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn cache_get(&self, name: &NetBiosName) -> Option<Ipv4Addr> {
        if !self.config.cache {
            return None;
        }
        let mut cache = self.cache.lock().ok()?;
        let entry = cache.get(name)?;
        if entry.expires <= OffsetDateTime::now_utc() {
            cache.remove(name);
            return None;
        }
        Some(entry.address)
    }

    fn cache_insert(&self, name: &NetBiosName, address: Ipv4Addr, ttl: u32) {
        // A zero TTL marks a name that must not be cached.
        if !self.config.cache || ttl == 0 {
            return;
        }
        if let Ok(mut cache) = self.cache.lock() {
            let now = OffsetDateTime::now_utc();
            cache.retain(|_, entry| entry.expires > now);
            let expires = now + time::Duration::seconds(ttl.into());
            cache.insert(name.clone(), CacheEntry { address, expires });
        }
    }

    /// Where a name query goes, in order: the WINS server, then the broadcast address.
    fn query_targets(&self) -> Vec<(SocketAddr, bool)> {
        let mut targets = Vec::with_capacity(2);
        if let Some(wins) = self.config.wins_server {
            targets.push((SocketAddrV4::new(wins, self.config.port).into(), false));
        }
        if self.config.broadcast {
            targets.push((
                SocketAddrV4::new(self.config.broadcast_address, self.config.port).into(),
                true,
            ));
        }
        targets
    }

    fn local_address(&self) -> SocketAddr {
        SocketAddrV4::new(self.config.bind_address, 0).into()
    }

    fn transaction_id() -> u16 {
        rand::random()
    }

    fn encode(packet: &NsPacket) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::with_capacity(NsPacket::MAX_DATAGRAM_SIZE));
        packet.write(&mut buf)?;
        Ok(buf.into_inner())
    }

    /// Parses a datagram, keeping it only if it answers `transaction_id`.
    fn accept_response(buf: &[u8], from: SocketAddr, transaction_id: u16) -> Option<NsPacket> {
        match NsPacket::read(&mut Cursor::new(buf)) {
            Ok(packet) if packet.is_response() && packet.transaction_id == transaction_id => {
                Some(packet)
            }
            Ok(packet) => {
                log::trace!(
                    "Ignoring packet {:#06x} from {from} while waiting for {transaction_id:#06x}",
                    packet.transaction_id
                );
                None
            }
            Err(e) => {
                log::debug!("Ignoring malformed datagram from {from}: {e}");
                None
            }
        }
    }

    /// Maps a non-zero RCODE to an error.
    fn check_rcode(response: &NsPacket, name: &NetBiosName) -> Result<()> {
        match response.rcode() {
            Rcode::NoError => Ok(()),
            Rcode::NameError => Err(Error::NameNotFound(name.to_string())),
            rcode => Err(Error::NameServiceError(rcode)),
        }
    }
}

#[maybe_async]
impl NameService {
    /// Resolves `name` with the given suffix to an IPv4 address.
    ///
    /// The cache is consulted first. Otherwise the WINS server is asked, then the
    /// local network is broadcast to, until one of them answers positively.
    pub async fn resolve(&self, name: &str, suffix: NameSuffix) -> Result<Ipv4Addr> {
        self.capabilities.require_sockets()?;
        let name = NetBiosName::new(name, suffix)?;
        if let Some(address) = self.cache_get(&name) {
            log::debug!("Resolved {name} to {address} from cache");
            return Ok(address);
        }

        let mut result = Err(Error::InvalidState(
            "neither a WINS server nor broadcast is configured".to_string(),
        ));
        for (target, broadcast) in self.query_targets() {
            let attempt = self.name_query(&name, target, broadcast).await;
            match attempt {
                Ok((address, ttl)) => {
                    log::debug!("Resolved {name} to {address} via {target}");
                    self.cache_insert(&name, address, ttl);
                    return Ok(address);
                }
                Err(e) => {
                    log::debug!("Query for {name} via {target} failed: {e}");
                    // A definitive negative answer outranks a later timeout.
                    if !matches!(result, Err(Error::NameNotFound(_))) {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }

    /// Sends a NAME QUERY to `target`; returns the first address and its TTL.
    async fn name_query(
        &self,
        name: &NetBiosName,
        target: SocketAddr,
        broadcast: bool,
    ) -> Result<(Ipv4Addr, u32)> {
        let request = NsPacket::name_query(Self::transaction_id(), name, broadcast);
        let response = self.transact(&request, target, broadcast).await?;
        Self::check_rcode(&response, name)?;

        let ttl = response
            .answers
            .iter()
            .find(|a| a.record_type == RecordType::Nb)
            .map_or(0, |a| a.ttl);
        let address = response
            .nb_addresses()?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NameNotFound(name.to_string()))?;
        Ok((address.address, ttl))
    }

    /// Asks the node at `address` for its name table.
    pub async fn node_status(&self, address: Ipv4Addr) -> Result<NodeStatus> {
        self.capabilities.require_sockets()?;
        let wildcard = NetBiosName::wildcard();
        let request = NsPacket::node_status_query(Self::transaction_id(), &wildcard);
        let target = SocketAddrV4::new(address, self.config.port).into();
        let response = self.transact(&request, target, false).await?;
        Self::check_rcode(&response, &wildcard)?;
        Ok(response.node_status()?)
    }

    /// Looks up the name `address` registered with `suffix`.
    pub async fn inverse(&self, address: Ipv4Addr, suffix: NameSuffix) -> Result<String> {
        let status = self.node_status(address).await?;
        status
            .unique_name(suffix)
            .map(NetBiosName::name)
            .ok_or_else(|| Error::NameNotFound(format!("{address} has no {suffix} name")))
    }

    /// Sends `request` and waits for the matching response,
    /// repeating the request up to the configured number of retries.
    async fn transact(
        &self,
        request: &NsPacket,
        target: SocketAddr,
        broadcast: bool,
    ) -> Result<NsPacket> {
        let socket = UdpTransport::bind(self.local_address(), broadcast).await?;
        let bytes = Self::encode(request)?;
        let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];
        let attempts = self.config.retries.max(1);

        for attempt in 1..=attempts {
            log::trace!(
                "Sending query {:#06x} to {target} (attempt {attempt}/{attempts})",
                request.transaction_id
            );
            socket.send_to(&bytes, target).await?;
            let deadline = Instant::now() + self.config.timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let (len, from) = match socket.recv_from(&mut buf, remaining).await {
                    Ok(received) => received,
                    Err(TransportError::Timeout(_)) => break,
                    Err(e) => return Err(e.into()),
                };
                if let Some(packet) =
                    Self::accept_response(&buf[..len], from, request.transaction_id)
                {
                    return Ok(packet);
                }
            }
        }
        Err(TransportError::Timeout(self.config.timeout * attempts).into())
    }

    /// Broadcasts `request` once and gathers every matching response until `wait` elapses.
    ///
    /// Fails with [`Error::InvalidState`] when broadcasting is disabled.
    pub(crate) async fn collect(
        &self,
        request: &NsPacket,
        wait: Duration,
    ) -> Result<Vec<(SocketAddr, NsPacket)>> {
        if !self.config.broadcast {
            return Err(Error::InvalidState(
                "broadcast is disabled in the name service configuration".to_string(),
            ));
        }
        let target = SocketAddrV4::new(self.config.broadcast_address, self.config.port).into();
        let socket = UdpTransport::bind(self.local_address(), true).await?;
        socket.send_to(&Self::encode(request)?, target).await?;

        let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];
        let mut responses = Vec::new();
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let (len, from) = match socket.recv_from(&mut buf, remaining).await {
                Ok(received) => received,
                Err(TransportError::Timeout(_)) => break,
                Err(e) => return Err(e.into()),
            };
            if let Some(packet) = Self::accept_response(&buf[..len], from, request.transaction_id)
            {
                responses.push((from, packet));
            }
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_targets_order() {
        let ns = NameService::new(
            NameServiceConfig {
                wins_server: Some(Ipv4Addr::new(10, 0, 0, 1)),
                ..Default::default()
            },
            PlatformCapabilities::current(),
        );
        let targets = ns.query_targets();
        assert_eq!(
            targets,
            vec![
                ("10.0.0.1:137".parse().unwrap(), false),
                ("255.255.255.255:137".parse().unwrap(), true),
            ]
        );

        let ns = NameService::new(
            NameServiceConfig {
                broadcast: false,
                ..Default::default()
            },
            PlatformCapabilities::current(),
        );
        assert!(ns.query_targets().is_empty());
    }

    #[test]
    fn test_cache_insert_and_clear() {
        let ns = NameService::new(Default::default(), PlatformCapabilities::current());
        let name = NetBiosName::new("FILESRV", NameSuffix::FILE_SERVER).unwrap();
        let address = Ipv4Addr::new(192, 168, 1, 5);

        ns.cache_insert(&name, address, 0);
        assert_eq!(ns.cache_get(&name), None);
        ns.cache_insert(&name, address, 300);
        assert_eq!(ns.cache_get(&name), Some(address));
        ns.cache_clear();
        assert_eq!(ns.cache_get(&name), None);
    }

    #[test]
    fn test_cache_insert_drops_expired_entries() {
        let ns = NameService::new(Default::default(), PlatformCapabilities::current());
        let stale = NetBiosName::new("OLDHOST", NameSuffix::FILE_SERVER).unwrap();
        let fresh = NetBiosName::new("NEWHOST", NameSuffix::FILE_SERVER).unwrap();
        ns.cache.lock().unwrap().insert(
            stale.clone(),
            CacheEntry {
                address: Ipv4Addr::new(192, 168, 1, 6),
                expires: OffsetDateTime::now_utc() - time::Duration::seconds(1),
            },
        );
        assert_eq!(ns.cache.lock().unwrap().len(), 1);

        ns.cache_insert(&fresh, Ipv4Addr::new(192, 168, 1, 7), 300);
        assert_eq!(ns.cache.lock().unwrap().len(), 1);
        assert_eq!(ns.cache_get(&stale), None);
        assert_eq!(ns.cache_get(&fresh), Some(Ipv4Addr::new(192, 168, 1, 7)));
    }

    #[test]
    fn test_cache_disabled() {
        let ns = NameService::new(
            NameServiceConfig {
                cache: false,
                ..Default::default()
            },
            PlatformCapabilities::current(),
        );
        let name = NetBiosName::new("FILESRV", NameSuffix::FILE_SERVER).unwrap();
        ns.cache_insert(&name, Ipv4Addr::LOCALHOST, 300);
        assert_eq!(ns.cache_get(&name), None);
    }

    #[test]
    fn test_accept_response_filters_transaction_id() {
        let name = NetBiosName::new("FRED", NameSuffix::WORKSTATION).unwrap();
        let mut response = NsPacket::name_query(0x1234, &name, false);
        response.flags.set_response(true);
        let bytes = NameService::encode(&response).unwrap();
        let from: SocketAddr = "127.0.0.1:137".parse().unwrap();

        assert!(NameService::accept_response(&bytes, from, 0x1234).is_some());
        assert!(NameService::accept_response(&bytes, from, 0x4321).is_none());
        assert!(NameService::accept_response(&bytes[..5], from, 0x1234).is_none());

        // Our own broadcast echoed back is a request, not an answer.
        let request = NameService::encode(&NsPacket::name_query(0x1234, &name, true)).unwrap();
        assert!(NameService::accept_response(&request, from, 0x1234).is_none());
    }
}
