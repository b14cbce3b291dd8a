//! Transport configuration.

use netbios_msg::{DIRECT_TCP_PORT, SESSION_SERVICE_PORT, SessionHeader};

/// Specifies how session packets are framed over TCP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportConfig {
    /// NetBIOS session service: a SESSION REQUEST handshake, then 17-bit framed messages.
    #[default]
    NetBios,
    /// SMB directly over TCP: no handshake, 24-bit framed messages.
    DirectTcp,
}

impl TransportConfig {
    pub fn default_port(&self) -> u16 {
        match self {
            TransportConfig::NetBios => SESSION_SERVICE_PORT,
            TransportConfig::DirectTcp => DIRECT_TCP_PORT,
        }
    }

    /// Largest payload a single packet may carry.
    pub fn max_payload(&self) -> u32 {
        match self {
            TransportConfig::NetBios => SessionHeader::MAX_NETBIOS_LENGTH,
            TransportConfig::DirectTcp => SessionHeader::MAX_DIRECT_TCP_LENGTH,
        }
    }
}
