//! Raw TCP stream with per-operation timeouts.

use std::net::SocketAddr;
use std::time::Duration;

#[cfg(feature = "async")]
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

#[cfg(not(feature = "async"))]
use std::{
    io::{Read, Write},
    net::{Shutdown, TcpStream},
};

use crate::{Result, TransportError};

/// A TCP connection used by the session service.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(timeout: Duration) -> Self {
        TcpTransport {
            stream: None,
            timeout,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn remote_address(&self) -> Option<SocketAddr> {
        self.stream.as_ref()?.peer_addr().ok()
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }
}

#[cfg(feature = "async")]
impl TcpTransport {
    pub async fn connect(&mut self, address: SocketAddr) -> Result<()> {
        if self.stream.is_some() {
            return Err(TransportError::AlreadyConnected);
        }
        log::debug!("Connecting to {address}");
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(address))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))??;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    pub async fn send(&mut self, buf: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        let stream = self.stream_mut()?;
        tokio::time::timeout(timeout, stream.write_all(buf))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;
        Ok(())
    }

    /// Fills `buf` completely from the stream.
    pub async fn receive_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let timeout = self.timeout;
        let stream = self.stream_mut()?;
        tokio::time::timeout(timeout, stream.read_exact(buf))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            log::debug!("Closing connection to {:?}", stream.peer_addr().ok());
            // The peer may already be gone.
            let _ = stream.shutdown().await;
        }
        Ok(())
    }
}

#[cfg(not(feature = "async"))]
impl TcpTransport {
    pub fn connect(&mut self, address: SocketAddr) -> Result<()> {
        if self.stream.is_some() {
            return Err(TransportError::AlreadyConnected);
        }
        log::debug!("Connecting to {address}");
        let stream = TcpStream::connect_timeout(&address, self.timeout)
            .map_err(|e| self.map_io_error(e))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    pub fn send(&mut self, buf: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        self.stream_mut()?
            .write_all(buf)
            .map_err(|e| Self::map_io_error_with(e, timeout))
    }

    /// Fills `buf` completely from the stream.
    pub fn receive_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let timeout = self.timeout;
        self.stream_mut()?
            .read_exact(buf)
            .map_err(|e| Self::map_io_error_with(e, timeout))
    }

    pub fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            log::debug!("Closing connection to {:?}", stream.peer_addr().ok());
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(())
    }

    fn map_io_error(&self, err: std::io::Error) -> TransportError {
        Self::map_io_error_with(err, self.timeout)
    }

    fn map_io_error_with(err: std::io::Error, timeout: Duration) -> TransportError {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                TransportError::Timeout(timeout)
            }
            _ => TransportError::IoError(err),
        }
    }
}
