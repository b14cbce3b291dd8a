//! Session service packets.
//!
//! Reference: RFC 1002 4.3

use std::net::Ipv4Addr;

use binrw::prelude::*;

use crate::EncodedName;
use netbios_derive::nbt_message_binrw;

/// Session service packet types.
#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[brw(repr(u8))]
pub enum SessionPacketType {
    Message = 0x00,
    Request = 0x81,
    PositiveResponse = 0x82,
    NegativeResponse = 0x83,
    RetargetResponse = 0x84,
    KeepAlive = 0x85,
}

/// The 4-byte header preceding every session service packet.
///
/// The flags byte holds the length extension bit, giving a 17-bit length.
/// SMB directly over TCP uses the same layout, with the flags byte acting as
/// the high byte of a 24-bit length.
#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[brw(big)]
pub struct SessionHeader {
    pub packet_type: SessionPacketType,
    length_high: u8,
    length_low: u16,
}

impl SessionHeader {
    pub const SIZE: usize = 4;
    /// Largest payload of a NetBIOS session packet (17-bit length).
    pub const MAX_NETBIOS_LENGTH: u32 = 0x1ffff;
    /// Largest payload of a direct TCP packet (24-bit length).
    pub const MAX_DIRECT_TCP_LENGTH: u32 = 0xffffff;

    /// Builds a header; `length` must fit in 24 bits.
    pub fn new(packet_type: SessionPacketType, length: u32) -> Self {
        debug_assert!(length <= Self::MAX_DIRECT_TCP_LENGTH);
        SessionHeader {
            packet_type,
            length_high: (length >> 16) as u8,
            length_low: length as u16,
        }
    }

    /// Length of the payload following the header.
    pub fn length(&self) -> u32 {
        ((self.length_high as u32) << 16) | self.length_low as u32
    }
}

/// SESSION REQUEST payload.
#[nbt_message_binrw]
#[derive(Clone)]
#[brw(big)]
pub struct SessionRequest {
    pub called_name: EncodedName,
    pub calling_name: EncodedName,
}

/// Error codes of a NEGATIVE SESSION RESPONSE.
#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[brw(repr(u8))]
pub enum SessionErrorCode {
    NotListeningOnCalledName = 0x80,
    NotListeningForCallingName = 0x81,
    CalledNameNotPresent = 0x82,
    InsufficientResources = 0x83,
    Unspecified = 0x8f,
}

impl std::fmt::Display for SessionErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            SessionErrorCode::NotListeningOnCalledName => "Not listening on called name",
            SessionErrorCode::NotListeningForCallingName => "Not listening for calling name",
            SessionErrorCode::CalledNameNotPresent => "Called name not present",
            SessionErrorCode::InsufficientResources => {
                "Called name present, but insufficient resources"
            }
            SessionErrorCode::Unspecified => "Unspecified error",
        };
        write!(f, "{} ({:#x})", message, *self as u8)
    }
}

/// NEGATIVE SESSION RESPONSE payload.
#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[brw(big)]
pub struct NegativeSessionResponse {
    pub error_code: SessionErrorCode,
}

/// SESSION RETARGET RESPONSE payload: where to reconnect.
#[nbt_message_binrw]
#[derive(Clone, Copy)]
#[brw(big)]
pub struct RetargetSessionResponse {
    #[br(map = |x: u32| Ipv4Addr::from(x))]
    #[bw(map = |a: &Ipv4Addr| u32::from(*a))]
    pub address: Ipv4Addr,
    pub port: u16,
}
