//! Node status (NBSTAT) response data: a node's name table and unit id.
//!
//! Reference: RFC 1002 4.2.18

use binrw::prelude::*;
use modular_bitfield::prelude::*;

use crate::{NameSuffix, NetBiosName, OwnerNodeType};
use netbios_derive::{mbitfield, nbt_message_binrw};

/// NAME_FLAGS of a node status entry: `G | ONT | DRG | CNF | ACT | PRM | reserved`.
#[mbitfield]
pub struct NodeNameFlags {
    #[skip]
    __: B1,
    pub permanent: bool,
    pub active: bool,
    pub conflict: bool,
    pub deregistering: bool,
    pub owner_node_type: B2,
    pub group: bool,
    #[skip]
    __: B8,
}

/// One entry of a node's name table.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(big)]
pub struct NodeName {
    #[br(try_map = NetBiosName::from_raw)]
    #[bw(map = |n: &NetBiosName| *n.as_raw())]
    pub name: NetBiosName,
    pub flags: NodeNameFlags,
}

impl NodeName {
    pub fn is_group(&self) -> bool {
        self.flags.group()
    }

    pub fn owner_node_type(&self) -> OwnerNodeType {
        self.flags.owner_node_type().into()
    }
}

/// The RDATA of a NODE STATUS RESPONSE.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(big)]
pub struct NodeStatus {
    #[bw(try_calc = u8::try_from(names.len()))]
    #[br(temp)]
    _name_count: u8,
    #[br(count = _name_count)]
    pub names: Vec<NodeName>,
    /// The unit id; Windows hosts report their MAC address here.
    pub unit_id: [u8; 6],
    /// The remainder of the statistics block, kept as-is.
    #[br(parse_with = binrw::helpers::until_eof)]
    pub statistics: Vec<u8>,
}

impl NodeStatus {
    /// The first unique (non-group) name registered with `suffix`.
    pub fn unique_name(&self, suffix: NameSuffix) -> Option<&NetBiosName> {
        self.names
            .iter()
            .find(|n| !n.is_group() && n.name.suffix() == suffix)
            .map(|n| &n.name)
    }

    /// The workgroup or domain: the first group name with the workstation suffix.
    pub fn group_name(&self) -> Option<&NetBiosName> {
        self.names
            .iter()
            .find(|n| n.is_group() && n.name.suffix() == NameSuffix::WORKSTATION)
            .map(|n| &n.name)
    }

    /// The host name, preferring the file server name over the workstation name.
    pub fn host_name(&self) -> Option<&NetBiosName> {
        self.unique_name(NameSuffix::FILE_SERVER)
            .or_else(|| self.unique_name(NameSuffix::WORKSTATION))
    }

    /// The unit id, or `None` when the node reports all zeros (e.g. Samba).
    pub fn mac_address(&self) -> Option<[u8; 6]> {
        self.unit_id.iter().any(|&b| b != 0).then_some(self.unit_id)
    }
}
