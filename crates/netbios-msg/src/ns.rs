//! Name service packets.
//!
//! Reference: RFC 1002 4.2

use std::io::Cursor;
use std::net::Ipv4Addr;

use binrw::{BinReaderExt, prelude::*};
use modular_bitfield::prelude::*;

use crate::{EncodedName, NbtMsgError, NetBiosName, NodeStatus, RecordName};
use netbios_derive::{mbitfield, nbt_message_binrw};

/// Name service packet opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Query = 0,
    Registration = 5,
    Release = 6,
    Wack = 7,
    Refresh = 8,
}

impl TryFrom<u8> for Opcode {
    type Error = NbtMsgError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Opcode::Query,
            5 => Opcode::Registration,
            6 => Opcode::Release,
            7 => Opcode::Wack,
            8 => Opcode::Refresh,
            _ => {
                return Err(NbtMsgError::InvalidData(format!(
                    "unknown name service opcode {value}"
                )));
            }
        })
    }
}

/// Name service response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    ActiveError,
    ConflictError,
    Other(u8),
}

impl From<u8> for Rcode {
    fn from(value: u8) -> Self {
        match value {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            6 => Rcode::ActiveError,
            7 => Rcode::ConflictError,
            other => Rcode::Other(other),
        }
    }
}

impl std::fmt::Display for Rcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rcode::NoError => write!(f, "no error"),
            Rcode::FormatError => write!(f, "format error"),
            Rcode::ServerFailure => write!(f, "server failure"),
            Rcode::NameError => write!(f, "requested name does not exist"),
            Rcode::NotImplemented => write!(f, "unsupported request"),
            Rcode::Refused => write!(f, "refused"),
            Rcode::ActiveError => write!(f, "name is owned by another node"),
            Rcode::ConflictError => write!(f, "name conflict"),
            Rcode::Other(code) => write!(f, "rcode {code}"),
        }
    }
}

/// The flags word of the name service header:
/// `R | OPCODE | AA | TC | RD | RA | 0 | 0 | B | RCODE`, most significant bit first.
///
/// Fields are declared in wire byte order, least significant bit of each byte first.
#[mbitfield]
pub struct NsFlags {
    pub recursion_desired: bool,
    pub truncated: bool,
    pub authoritative: bool,
    pub opcode: B4,
    pub response: bool,

    pub rcode: B4,
    pub broadcast: bool,
    #[skip]
    __: B2,
    pub recursion_available: bool,
}

/// Resource record and question types used by the name service.
#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[brw(big, repr(u16))]
pub enum RecordType {
    A = 0x0001,
    Ns = 0x0002,
    Null = 0x000a,
    Nb = 0x0020,
    NbStat = 0x0021,
}

#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[brw(big, repr(u16))]
pub enum RecordClass {
    Internet = 0x0001,
}

/// A question entry.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(big)]
pub struct Question {
    pub name: EncodedName,
    pub question_type: RecordType,
    pub question_class: RecordClass,
}

/// A resource record, as found in the answer, authority and additional sections.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(big)]
pub struct ResourceRecord {
    pub name: RecordName,
    pub record_type: RecordType,
    pub record_class: RecordClass,
    /// Time to live, in seconds.
    pub ttl: u32,
    #[bw(try_calc = u16::try_from(rdata.len()))]
    #[br(temp)]
    _rdata_length: u16,
    #[br(count = _rdata_length)]
    pub rdata: Vec<u8>,
}

/// A full name service packet.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(big)]
pub struct NsPacket {
    pub transaction_id: u16,
    pub flags: NsFlags,
    #[bw(try_calc = u16::try_from(questions.len()))]
    #[br(temp)]
    _question_count: u16,
    #[bw(try_calc = u16::try_from(answers.len()))]
    #[br(temp)]
    _answer_count: u16,
    #[bw(try_calc = u16::try_from(authorities.len()))]
    #[br(temp)]
    _authority_count: u16,
    #[bw(try_calc = u16::try_from(additionals.len()))]
    #[br(temp)]
    _additional_count: u16,

    #[br(count = _question_count)]
    pub questions: Vec<Question>,
    #[br(count = _answer_count)]
    pub answers: Vec<ResourceRecord>,
    #[br(count = _authority_count)]
    pub authorities: Vec<ResourceRecord>,
    #[br(count = _additional_count)]
    pub additionals: Vec<ResourceRecord>,
}

impl NsPacket {
    /// Largest datagram the name service sends (RFC 1002 4.2.1).
    pub const MAX_DATAGRAM_SIZE: usize = 576;

    fn query(transaction_id: u16, flags: NsFlags, question: Question) -> Self {
        NsPacket {
            transaction_id,
            flags,
            questions: vec![question],
            answers: vec![],
            authorities: vec![],
            additionals: vec![],
        }
    }

    /// A NAME QUERY REQUEST for `name`, broadcast or directed to a name server.
    ///
    /// Reference: RFC 1002 4.2.12
    pub fn name_query(transaction_id: u16, name: &NetBiosName, broadcast: bool) -> Self {
        let flags = NsFlags::new()
            .with_opcode(Opcode::Query as u8)
            .with_recursion_desired(true)
            .with_broadcast(broadcast);
        Self::query(
            transaction_id,
            flags,
            Question {
                name: name.clone().into(),
                question_type: RecordType::Nb,
                question_class: RecordClass::Internet,
            },
        )
    }

    /// A NODE STATUS REQUEST, asking a node for its whole name table.
    ///
    /// Reference: RFC 1002 4.2.17
    pub fn node_status_query(transaction_id: u16, name: &NetBiosName) -> Self {
        Self::query(
            transaction_id,
            NsFlags::new().with_opcode(Opcode::Query as u8),
            Question {
                name: name.clone().into(),
                question_type: RecordType::NbStat,
                question_class: RecordClass::Internet,
            },
        )
    }

    pub fn is_response(&self) -> bool {
        self.flags.response()
    }

    pub fn opcode(&self) -> crate::Result<Opcode> {
        self.flags.opcode().try_into()
    }

    pub fn rcode(&self) -> Rcode {
        self.flags.rcode().into()
    }

    /// Parses every address entry of the NB answers.
    pub fn nb_addresses(&self) -> crate::Result<Vec<NbAddress>> {
        let mut addresses = Vec::new();
        for answer in self
            .answers
            .iter()
            .filter(|a| a.record_type == RecordType::Nb)
        {
            if answer.rdata.len() % NbAddress::SIZE != 0 {
                return Err(NbtMsgError::InvalidData(format!(
                    "NB rdata length {} is not a multiple of {}",
                    answer.rdata.len(),
                    NbAddress::SIZE
                )));
            }
            let mut cursor = Cursor::new(&answer.rdata);
            for _ in 0..answer.rdata.len() / NbAddress::SIZE {
                addresses.push(cursor.read_be::<NbAddress>()?);
            }
        }
        Ok(addresses)
    }

    /// Parses the node status of the first NBSTAT answer.
    pub fn node_status(&self) -> crate::Result<NodeStatus> {
        let answer = self
            .answers
            .iter()
            .find(|a| a.record_type == RecordType::NbStat)
            .ok_or_else(|| NbtMsgError::InvalidData("no NBSTAT answer in packet".into()))?;
        Ok(Cursor::new(&answer.rdata).read_be::<NodeStatus>()?)
    }
}

/// Owner node type of a name (RFC 1001 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerNodeType {
    Broadcast,
    PointToPoint,
    Mixed,
    Hybrid,
}

impl From<u8> for OwnerNodeType {
    fn from(bits: u8) -> Self {
        match bits & 0b11 {
            0 => OwnerNodeType::Broadcast,
            1 => OwnerNodeType::PointToPoint,
            2 => OwnerNodeType::Mixed,
            _ => OwnerNodeType::Hybrid,
        }
    }
}

/// NB_FLAGS of an address entry: `G | ONT | reserved`.
#[mbitfield]
pub struct NbFlags {
    #[skip]
    __: B5,
    pub owner_node_type: B2,
    pub group: bool,
    #[skip]
    __: B8,
}

/// One address entry of an NB resource record.
#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[brw(big)]
pub struct NbAddress {
    pub flags: NbFlags,
    #[br(map = |x: u32| Ipv4Addr::from(x))]
    #[bw(map = |a: &Ipv4Addr| u32::from(*a))]
    pub address: Ipv4Addr,
}

impl NbAddress {
    pub const SIZE: usize = 6;

    pub fn is_group(&self) -> bool {
        self.flags.group()
    }

    pub fn owner_node_type(&self) -> OwnerNodeType {
        self.flags.owner_node_type().into()
    }
}
