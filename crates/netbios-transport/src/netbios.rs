//! Framed session transport: NetBIOS session service or direct TCP.

use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use binrw::{BinRead, BinWrite, io::Cursor};
use maybe_async::maybe_async;
use netbios_msg::{
    NegativeSessionResponse, NetBiosName, RetargetSessionResponse, SessionHeader,
    SessionPacketType, SessionRequest,
};

use crate::{Result, TcpTransport, TransportConfig, TransportError};

/// Sends and receives session messages over a TCP connection,
/// framing each one with a [`SessionHeader`].
#[derive(Debug)]
pub struct NetBiosTransport {
    tcp: TcpTransport,
    config: TransportConfig,
    max_retargets: usize,
}

impl NetBiosTransport {
    pub const DEFAULT_MAX_RETARGETS: usize = 4;

    pub fn new(config: TransportConfig, timeout: Duration) -> Self {
        NetBiosTransport {
            tcp: TcpTransport::new(timeout),
            config,
            max_retargets: Self::DEFAULT_MAX_RETARGETS,
        }
    }

    pub fn with_max_retargets(mut self, max_retargets: usize) -> Self {
        self.max_retargets = max_retargets;
        self
    }

    pub fn config(&self) -> TransportConfig {
        self.config
    }

    pub fn is_connected(&self) -> bool {
        self.tcp.is_connected()
    }

    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.tcp.remote_address()
    }
}

#[maybe_async]
impl NetBiosTransport {
    /// Connects to `address`.
    ///
    /// For the NetBIOS session service this performs the SESSION REQUEST handshake,
    /// reconnecting wherever a SESSION RETARGET RESPONSE points to.
    /// Returns the address the session was finally established with.
    pub async fn connect(
        &mut self,
        address: SocketAddr,
        called: &NetBiosName,
        calling: &NetBiosName,
    ) -> Result<SocketAddr> {
        let mut address = address;
        for _ in 0..=self.max_retargets {
            self.tcp.connect(address).await?;
            if self.config == TransportConfig::DirectTcp {
                return Ok(address);
            }
            match self.session_request(called, calling).await {
                Ok(None) => {
                    log::debug!("Session with {called} established at {address}");
                    return Ok(address);
                }
                Ok(Some(retarget)) => {
                    log::debug!("Session with {called} retargeted from {address} to {retarget}");
                    self.tcp.close().await?;
                    address = retarget;
                }
                Err(e) => {
                    self.tcp.close().await?;
                    return Err(e);
                }
            }
        }
        Err(TransportError::TooManyRetargets(self.max_retargets))
    }

    /// Sends SESSION REQUEST and interprets the reply.
    /// `Ok(Some(_))` is a retarget.
    async fn session_request(
        &mut self,
        called: &NetBiosName,
        calling: &NetBiosName,
    ) -> Result<Option<SocketAddr>> {
        let request = SessionRequest {
            called_name: called.clone().into(),
            calling_name: calling.clone().into(),
        };
        let mut payload = Cursor::new(Vec::new());
        request.write(&mut payload)?;
        self.send_packet(SessionPacketType::Request, payload.get_ref())
            .await?;

        let (header, payload) = self.receive_packet().await?;
        let mut cursor = Cursor::new(&payload);
        match header.packet_type {
            SessionPacketType::PositiveResponse => Ok(None),
            SessionPacketType::NegativeResponse => {
                let response = NegativeSessionResponse::read(&mut cursor)?;
                log::warn!("Session request for {called} rejected: {}", response.error_code);
                Err(TransportError::SessionRejected(response.error_code))
            }
            SessionPacketType::RetargetResponse => {
                let response = RetargetSessionResponse::read(&mut cursor)?;
                Ok(Some(SocketAddr::V4(SocketAddrV4::new(
                    response.address,
                    response.port,
                ))))
            }
            other => Err(TransportError::InvalidMessage(format!(
                "unexpected {other:?} packet in reply to session request"
            ))),
        }
    }

    /// Sends one session message.
    pub async fn send(&mut self, message: &[u8]) -> Result<()> {
        self.send_packet(SessionPacketType::Message, message).await
    }

    pub async fn send_keepalive(&mut self) -> Result<()> {
        if self.config == TransportConfig::DirectTcp {
            return Ok(());
        }
        self.send_packet(SessionPacketType::KeepAlive, &[]).await
    }

    /// Receives the next session message, skipping keep-alives.
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        loop {
            let (header, payload) = self.receive_packet().await?;
            match header.packet_type {
                SessionPacketType::Message => return Ok(payload),
                SessionPacketType::KeepAlive => {
                    log::trace!("Skipping session keep-alive");
                }
                other => {
                    return Err(TransportError::InvalidMessage(format!(
                        "unexpected {other:?} packet in established session"
                    )));
                }
            }
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        self.tcp.close().await
    }

    async fn send_packet(&mut self, packet_type: SessionPacketType, payload: &[u8]) -> Result<()> {
        let max_payload = self.config.max_payload();
        if payload.len() > max_payload as usize {
            return Err(TransportError::MessageTooLarge(payload.len(), max_payload));
        }
        let header = SessionHeader::new(packet_type, payload.len() as u32);
        let mut buf = Cursor::new(Vec::with_capacity(SessionHeader::SIZE + payload.len()));
        header.write(&mut buf)?;
        let mut buf = buf.into_inner();
        buf.extend_from_slice(payload);
        log::trace!("Sending {packet_type:?} packet, {} bytes", payload.len());
        self.tcp.send(&buf).await
    }

    async fn receive_packet(&mut self) -> Result<(SessionHeader, Vec<u8>)> {
        let mut header_buf = [0u8; SessionHeader::SIZE];
        self.tcp.receive_exact(&mut header_buf).await?;
        let header = SessionHeader::read(&mut Cursor::new(&header_buf))?;
        let length = header.length();
        if length > self.config.max_payload() {
            return Err(TransportError::InvalidMessage(format!(
                "packet length {length:#x} exceeds framing limit"
            )));
        }
        let mut payload = vec![0u8; length as usize];
        self.tcp.receive_exact(&mut payload).await?;
        log::trace!("Received {:?} packet, {length} bytes", header.packet_type);
        Ok((header, payload))
    }
}
