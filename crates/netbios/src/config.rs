//! Client configuration.

use std::net::Ipv4Addr;
use std::time::Duration;

use netbios_msg::NAME_SERVICE_PORT;
use netbios_transport::{NetBiosTransport, TransportConfig};

use crate::PlatformCapabilities;

/// Name service query settings.
#[derive(Debug, Clone)]
pub struct NameServiceConfig {
    /// How long to wait for answers to a single query.
    pub timeout: Duration,
    /// Number of times a query is sent before giving up.
    pub retries: u32,
    /// WINS server queried by unicast before falling back to broadcast.
    pub wins_server: Option<Ipv4Addr>,
    /// Whether to broadcast queries on the local network. Discovery needs it.
    pub broadcast: bool,
    pub broadcast_address: Ipv4Addr,
    /// Remote name service port.
    pub port: u16,
    /// Local address queries are sent from; port 0 is always used.
    pub bind_address: Ipv4Addr,
    /// Whether resolved names are cached for their TTL.
    pub cache: bool,
}

impl Default for NameServiceConfig {
    fn default() -> Self {
        NameServiceConfig {
            timeout: Duration::from_secs(2),
            retries: 3,
            wins_server: None,
            broadcast: true,
            broadcast_address: Ipv4Addr::BROADCAST,
            port: NAME_SERVICE_PORT,
            bind_address: Ipv4Addr::UNSPECIFIED,
            cache: true,
        }
    }
}

/// Session establishment settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub transport: TransportConfig,
    /// Overrides the transport's default port.
    pub port: Option<u16>,
    pub timeout: Duration,
    /// Our name, sent as the calling name of a session request.
    pub calling_name: String,
    /// How many SESSION RETARGET responses to follow.
    pub max_retargets: usize,
}

impl SessionConfig {
    pub const DEFAULT_CALLING_NAME: &'static str = "NETBIOS-RS";

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.transport.default_port())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            transport: TransportConfig::default(),
            port: None,
            timeout: Duration::from_secs(10),
            calling_name: Self::DEFAULT_CALLING_NAME.to_string(),
            max_retargets: NetBiosTransport::DEFAULT_MAX_RETARGETS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub name_service: NameServiceConfig,
    pub session: SessionConfig,
    /// Overrides the detected platform capabilities.
    pub capabilities: Option<PlatformCapabilities>,
}

impl ClientConfig {
    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
            .unwrap_or_else(PlatformCapabilities::current)
    }
}
