//! Datagram socket for the name service.

use std::net::SocketAddr;
use std::time::Duration;

#[cfg(feature = "async")]
use tokio::net::UdpSocket;

#[cfg(not(feature = "async"))]
use std::net::UdpSocket;

use crate::{Result, TransportError};

/// A bound UDP socket. Each name service query uses its own socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn local_address(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[cfg(feature = "async")]
impl UdpTransport {
    /// Binds to `local`, enabling broadcast sends if requested.
    pub async fn bind(local: SocketAddr, broadcast: bool) -> Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        socket.set_broadcast(broadcast)?;
        Ok(UdpTransport { socket })
    }

    pub async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<()> {
        let sent = self.socket.send_to(buf, target).await?;
        if sent != buf.len() {
            return Err(TransportError::InvalidMessage(format!(
                "short datagram write: {sent} of {} bytes",
                buf.len()
            )));
        }
        Ok(())
    }

    /// Waits at most `timeout` for the next datagram.
    pub async fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> Result<(usize, SocketAddr)> {
        tokio::time::timeout(timeout, self.socket.recv_from(buf))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(TransportError::from)
    }
}

#[cfg(not(feature = "async"))]
impl UdpTransport {
    /// Binds to `local`, enabling broadcast sends if requested.
    pub fn bind(local: SocketAddr, broadcast: bool) -> Result<Self> {
        let socket = UdpSocket::bind(local)?;
        socket.set_broadcast(broadcast)?;
        Ok(UdpTransport { socket })
    }

    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<()> {
        let sent = self.socket.send_to(buf, target)?;
        if sent != buf.len() {
            return Err(TransportError::InvalidMessage(format!(
                "short datagram write: {sent} of {} bytes",
                buf.len()
            )));
        }
        Ok(())
    }

    /// Waits at most `timeout` for the next datagram.
    pub fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> Result<(usize, SocketAddr)> {
        // A zero read timeout means "block forever" to the OS.
        if timeout.is_zero() {
            return Err(TransportError::Timeout(timeout));
        }
        self.socket.set_read_timeout(Some(timeout))?;
        self.socket.recv_from(buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                TransportError::Timeout(timeout)
            }
            _ => TransportError::IoError(e),
        })
    }
}
