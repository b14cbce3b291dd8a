//! SMB negotiate probe messages and NT status codes.
//!
//! The probe sends a minimal SMB1 multi-protocol NEGOTIATE over an established
//! session and reads back just enough of the reply to learn the protocol
//! family and the status the server answered with.

use std::io::Cursor;

use binrw::io::TakeSeekExt;
use binrw::prelude::*;

use crate::NbtMsgError;
use netbios_derive::nbt_message_binrw;

macro_rules! make_status {
    (
        $($name:ident = $value:literal: $description:literal, )+
    ) => {

/// NT Status codes commonly returned to a negotiating client.
///
/// For each status code, a U32 constant is also provided for easier access.
/// for example, [`Status::U32_ACCESS_DENIED`] is `0xC0000022`, matching [`Status::AccessDenied`].
#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[repr(u32)]
#[brw(repr(u32))]
pub enum Status {
    $(
        #[doc = concat!($description, " (", stringify!($value), ")")]
        $name = $value,
    )+
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message_as_string = match self {
            $(
                Status::$name => $description,
            )+
        };
        write!(f, "{} ({:#x})", message_as_string, *self as u32)
    }
}

impl Status {
    // Consts for easier status code as u32 access.
    pastey::paste! {
        $(
            #[doc = concat!("[`", stringify!($name), "`][Self::", stringify!($name), "] as u32")]
            pub const [<U32_ $name:snake:upper>]: u32 = $value;
        )+
    }

    /// A helper function that tries converting u32 to a [`Status`],
    /// and returns a string representation of the status. Otherwise,
    /// it returns the hex representation of the u32 value.
    pub fn try_display_as_status(value: u32) -> String {
        match Self::try_from(value) {
            Ok(status) => format!("{}", status),
            Err(_) => format!("{:#010x}", value),
        }
    }
}

impl TryFrom<u32> for Status {
    type Error = NbtMsgError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Status::read_le(&mut Cursor::new(value.to_le_bytes())).map_err(|_| {
            Self::Error::MissingErrorCodeDefinition(value)
        })
    }
}
    };
}

make_status! {
    Success = 0x00000000: "Success",
    Pending = 0x00000103: "Pending",
    InvalidSmb = 0x00010002: "Invalid SMB",
    SmbBadCommand = 0x00160002: "SMB Bad Command",
    SmbUseStandard = 0x00FB0002: "SMB Use Standard",
    BufferOverflow = 0x80000005: "Buffer Overflow",
    NotImplemented = 0xC0000002: "Not Implemented",
    InvalidParameter = 0xC000000D: "Invalid Parameter",
    MoreProcessingRequired = 0xC0000016: "More Processing Required",
    AccessDenied = 0xC0000022: "Access Denied",
    LogonFailure = 0xC000006D: "Logon Failure",
    AccountRestriction = 0xC000006E: "Account Restriction",
    InsufficientResources = 0xC000009A: "Insufficient Resources",
    IoTimeout = 0xC00000B5: "I/O Timeout",
    NotSupported = 0xC00000BB: "Not Supported",
    NetworkNameDeleted = 0xC00000C9: "Network Name Deleted",
    BadNetworkName = 0xC00000CC: "Bad Network Name",
    RequestNotAccepted = 0xC00000D0: "Request Not Accepted",
    InvalidNetworkResponse = 0xC00000C3: "Invalid Network Response",
    UserSessionDeleted = 0xC0000203: "User Session Deleted",
    ConnectionRefused = 0xC0000236: "Connection Refused",
    NetworkSessionExpired = 0xC000035C: "Network Session Expired",
    SmbTooManyUids = 0xC000205A: "SMB Too Many UIDs",
}

/// NT status severity, the two most significant bits of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Informational,
    Warning,
    Error,
}

impl Severity {
    pub fn of(status: u32) -> Self {
        match status >> 30 {
            0 => Severity::Success,
            1 => Severity::Informational,
            2 => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A (very) minimal SMB1 negotiation message.
///
/// See [`Smb1NegotiateRequest::default`] for a default message that
/// announces support for SMB2/3, as a part of multi-protocol negotiation.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(little)]
#[brw(magic(b"\xffSMB"))]
pub struct Smb1NegotiateRequest {
    #[bw(calc = Smb1NegotiateRequest::COMMAND)]
    #[br(assert(_command == Smb1NegotiateRequest::COMMAND))]
    #[br(temp)]
    _command: u8,
    status: u32,
    flags: u8,
    flags2: u16,
    #[bw(calc = 0)]
    #[br(temp)]
    _pid_high: u16,
    security_features: [u8; 8],
    reserved: u16,
    #[bw(calc = 0xffff)]
    #[br(temp)]
    _tid: u16,
    #[bw(calc = 1)]
    #[br(temp)]
    _pid_low: u16,
    /// uid
    reserved: u16,
    /// mid
    reserved: u16,
    // word count is always 0x0 according to MS-CIFS.
    #[bw(calc = 0)]
    #[br(assert(_word_count == 0))]
    #[br(temp)]
    _word_count: u8,
    #[bw(try_calc = u16::try_from(dialects.iter().map(Smb1Dialect::wire_size).sum::<usize>()))]
    #[br(temp)]
    _byte_count: u16,
    #[br(map_stream = |s| s.take_seek(_byte_count.into()), parse_with = binrw::helpers::until_eof)]
    dialects: Vec<Smb1Dialect>,
}

impl Smb1NegotiateRequest {
    const COMMAND: u8 = 0x72;

    /// Check if SMB2 is offered in the dialects list.
    pub fn is_smb2_offered(&self) -> bool {
        self.dialects.iter().any(|d| d.name.to_string() == "SMB 2.002")
    }

    /// The offered dialect names, in order. The server's SMB1 reply refers to them by index.
    pub fn dialect_names(&self) -> Vec<String> {
        self.dialects.iter().map(|d| d.name.to_string()).collect()
    }
}

impl Default for Smb1NegotiateRequest {
    fn default() -> Self {
        Self {
            status: 0,
            flags: 0x18,
            flags2: 0xc853,
            security_features: [0; 8],
            dialects: ["NT LM 0.12", "SMB 2.002", "SMB 2.???"]
                .into_iter()
                .map(|name| Smb1Dialect {
                    name: binrw::NullString::from(name),
                })
                .collect(),
        }
    }
}

/// SMB1 Dialect String
#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone)]
#[brw(magic(b"\x02"))]
pub struct Smb1Dialect {
    name: binrw::NullString,
}

impl Smb1Dialect {
    /// Buffer format byte, the string and its terminator.
    fn wire_size(&self) -> usize {
        self.name.0.len() + 2
    }
}

impl TryFrom<Smb1NegotiateRequest> for Vec<u8> {
    type Error = binrw::Error;
    fn try_from(value: Smb1NegotiateRequest) -> Result<Self, Self::Error> {
        let mut buf = Cursor::new(Vec::new());
        value.write(&mut buf)?;
        Ok(buf.into_inner())
    }
}

/// The fixed part of an SMB1 reply header, followed by the raw parameter and data blocks.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(little)]
pub struct Smb1ReplyHeader {
    pub command: u8,
    pub status: u32,
    pub flags: u8,
    pub flags2: u16,
    pub pid_high: u16,
    pub security_features: [u8; 8],
    reserved: u16,
    pub tid: u16,
    pub pid_low: u16,
    pub uid: u16,
    pub mid: u16,
    #[br(parse_with = binrw::helpers::until_eof)]
    pub body: Vec<u8>,
}

impl Smb1ReplyHeader {
    const FLAGS2_NT_STATUS: u16 = 0x4000;

    /// Whether `status` is an NT status rather than a DOS error class and code.
    pub fn uses_nt_status(&self) -> bool {
        self.flags2 & Self::FLAGS2_NT_STATUS != 0
    }

    /// The DOS error class, the low byte of `status`; zero on success.
    pub fn error_class(&self) -> u8 {
        self.status as u8
    }

    pub fn is_error(&self) -> bool {
        if self.uses_nt_status() {
            Severity::of(self.status) == Severity::Error
        } else {
            self.error_class() != 0
        }
    }

    /// The index of the dialect the server chose, from the negotiate response words.
    ///
    /// 0xFFFF means none of the offered dialects was acceptable.
    pub fn dialect_index(&self) -> Option<u16> {
        match self.body.as_slice() {
            [word_count, lo, hi, ..] if *word_count >= 1 => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }
}

/// The fixed part of an SMB2 reply header, followed by the raw response body.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(little)]
pub struct Smb2ReplyHeader {
    #[bw(calc = 64)]
    #[br(temp)]
    #[br(assert(_structure_size == 64))]
    _structure_size: u16,
    pub credit_charge: u16,
    pub status: u32,
    pub command: u16,
    pub credit_response: u16,
    pub flags: u32,
    pub next_command: u32,
    pub message_id: u64,
    /// Reserved + tree id, or the async id.
    pub async_or_tree: u64,
    pub session_id: u64,
    pub signature: [u8; 16],
    #[br(parse_with = binrw::helpers::until_eof)]
    pub body: Vec<u8>,
}

/// The leading fields of an SMB2 NEGOTIATE response body.
#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[brw(little)]
pub struct Smb2NegotiateReplyPrefix {
    #[bw(calc = 65)]
    #[br(temp)]
    #[br(assert(_structure_size == 65))]
    _structure_size: u16,
    pub security_mode: u16,
    pub dialect_revision: u16,
    pub negotiate_context_count: u16,
    pub server_guid: [u8; 16],
}

impl Smb2ReplyHeader {
    const NEGOTIATE: u16 = 0;

    /// Parses the body as a NEGOTIATE response, if it is one.
    pub fn negotiate_prefix(&self) -> Option<Smb2NegotiateReplyPrefix> {
        if self.command != Self::NEGOTIATE {
            return None;
        }
        Smb2NegotiateReplyPrefix::read(&mut Cursor::new(&self.body)).ok()
    }
}

/// A reply to the probe, in either protocol family.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(little)]
pub enum SmbReply {
    #[brw(magic(b"\xffSMB"))]
    Smb1(Smb1ReplyHeader),
    #[brw(magic(b"\xfeSMB"))]
    Smb2(Smb2ReplyHeader),
}

impl SmbReply {
    pub fn status(&self) -> u32 {
        match self {
            SmbReply::Smb1(h) => h.status,
            SmbReply::Smb2(h) => h.status,
        }
    }

    /// Whether the server failed the request, by NT severity or DOS error class.
    pub fn is_error(&self) -> bool {
        match self {
            SmbReply::Smb1(h) => h.is_error(),
            SmbReply::Smb2(h) => Severity::of(h.status) == Severity::Error,
        }
    }
}

impl TryFrom<&[u8]> for SmbReply {
    type Error = binrw::Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        SmbReply::read(&mut Cursor::new(value))
    }
}
