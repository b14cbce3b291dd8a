//! NetBIOS sessions.
//!
//! A [`Session`] owns one TCP connection, either to the NetBIOS session service
//! (after a successful SESSION REQUEST) or directly to the SMB port.
//! Every I/O operation takes `&mut self`; share a session between tasks only
//! behind a lock.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use maybe_async::maybe_async;
use netbios_msg::{NameSuffix, NetBiosName};
use netbios_transport::{NetBiosTransport, TransportError};

use crate::{Error, PlatformCapabilities, Result, SessionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Established,
    Closed,
}

pub struct Session {
    transport: NetBiosTransport,
    state: SessionState,
    called_name: NetBiosName,
    remote_address: SocketAddr,
    pub(crate) last_nt_status: u32,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The address the session was established with, after any retargets.
    pub fn remote_address(&self) -> SocketAddr {
        self.remote_address
    }

    pub fn called_name(&self) -> &NetBiosName {
        &self.called_name
    }

    /// The status of the last SMB reply received on this session, 0 before any.
    ///
    /// Overwritten by the next SMB exchange.
    pub fn last_nt_status(&self) -> u32 {
        self.last_nt_status
    }

    fn ensure_established(&self) -> Result<()> {
        match self.state {
            SessionState::Established => Ok(()),
            state => Err(Error::InvalidState(format!(
                "session with {} is {state:?}",
                self.called_name
            ))),
        }
    }

    /// Converts a transport failure, closing the session if the connection is lost.
    fn transport_failed(&mut self, err: TransportError) -> Error {
        if !matches!(err, TransportError::MessageTooLarge(..)) {
            log::warn!("Session with {} lost: {err}", self.called_name);
            self.state = SessionState::Closed;
        }
        err.into()
    }
}

#[maybe_async]
impl Session {
    /// Opens a session with `called_name` at `address`.
    pub async fn connect(
        config: &SessionConfig,
        capabilities: PlatformCapabilities,
        address: Ipv4Addr,
        called_name: &NetBiosName,
    ) -> Result<Session> {
        capabilities.require_sockets()?;
        let calling_name = NetBiosName::new(&config.calling_name, NameSuffix::WORKSTATION)?;
        let target: SocketAddr = SocketAddrV4::new(address, config.port()).into();

        let mut session = Session {
            transport: NetBiosTransport::new(config.transport, config.timeout)
                .with_max_retargets(config.max_retargets),
            state: SessionState::Connecting,
            called_name: called_name.clone(),
            remote_address: target,
            last_nt_status: 0,
        };
        log::debug!("Opening {:?} session with {called_name} at {target}", config.transport);
        session.remote_address = session
            .transport
            .connect(target, called_name, &calling_name)
            .await?;
        session.state = SessionState::Established;
        log::info!(
            "Session with {called_name} established at {}",
            session.remote_address
        );
        Ok(session)
    }

    /// Sends one session message.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_established()?;
        match self.transport.send(payload).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.transport_failed(e)),
        }
    }

    /// Receives the next session message. Keep-alives are skipped.
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        self.ensure_established()?;
        match self.transport.receive().await {
            Ok(message) => Ok(message),
            Err(e) => Err(self.transport_failed(e)),
        }
    }

    pub async fn keepalive(&mut self) -> Result<()> {
        self.ensure_established()?;
        match self.transport.send_keepalive().await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.transport_failed(e)),
        }
    }

    /// Closes the connection. Closing a closed session does nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        log::info!("Closing session with {}", self.called_name);
        self.transport.close().await?;
        Ok(())
    }
}
