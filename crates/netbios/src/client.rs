//! The client facade.

use std::net::Ipv4Addr;
use std::time::Duration;

use maybe_async::maybe_async;
use netbios_msg::{NameSuffix, NetBiosName, NodeStatus};

use crate::{
    ClientConfig, NameService, NsEntry, PlatformCapabilities, Result, Session, SmbProbe,
};

/// Entry point of the library: name service queries and sessions, configured once.
pub struct Client {
    config: ClientConfig,
    name_service: NameService,
}

impl Client {
    /// Called name used when connecting to a host by address.
    pub const GENERIC_SERVER_NAME: &'static str = "*SMBSERVER";

    pub fn new(config: ClientConfig) -> Self {
        let name_service = NameService::new(config.name_service.clone(), config.capabilities());
        Client {
            config,
            name_service,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.config.capabilities()
    }

    pub fn name_service(&self) -> &NameService {
        &self.name_service
    }
}

#[maybe_async]
impl Client {
    /// Resolves a NetBIOS name; see [`NameService::resolve`].
    pub async fn resolve(&self, name: &str, suffix: NameSuffix) -> Result<Ipv4Addr> {
        self.name_service.resolve(name, suffix).await
    }

    pub async fn inverse(&self, address: Ipv4Addr, suffix: NameSuffix) -> Result<String> {
        self.name_service.inverse(address, suffix).await
    }

    pub async fn node_status(&self, address: Ipv4Addr) -> Result<NodeStatus> {
        self.name_service.node_status(address).await
    }

    pub async fn discover(&self, wait: Duration) -> Result<Vec<NsEntry>> {
        self.name_service.discover(wait).await
    }

    /// Opens a session with `host`, a dotted IPv4 address or a NetBIOS name.
    ///
    /// Names are resolved as file servers. Hosts given by address are called
    /// by the generic server name.
    pub async fn connect(&self, host: &str) -> Result<Session> {
        let (address, called_name) = match host.parse::<Ipv4Addr>() {
            Ok(address) => (
                address,
                NetBiosName::new(Self::GENERIC_SERVER_NAME, NameSuffix::FILE_SERVER)?,
            ),
            Err(_) => {
                let called_name = NetBiosName::new(host, NameSuffix::FILE_SERVER)?;
                let address = self.resolve(host, NameSuffix::FILE_SERVER).await?;
                (address, called_name)
            }
        };
        Session::connect(
            &self.config.session,
            self.capabilities(),
            address,
            &called_name,
        )
        .await
    }

    /// Connects to `host`, runs [`Session::smb_negotiate_probe`] and closes the session.
    pub async fn probe(&self, host: &str) -> Result<SmbProbe> {
        let mut session = self.connect(host).await?;
        let probe = session.smb_negotiate_probe().await;
        let closed = session.close().await;
        let probe = probe?;
        closed?;
        Ok(probe)
    }
}
