//! Transport primitives available on the running platform.

use std::sync::OnceLock;

use crate::{Error, Result};

/// Which transport primitives the platform offers.
///
/// Resolved once per process by [`PlatformCapabilities::current`]; a
/// [`ClientConfig`](crate::ClientConfig) may override it, e.g. to exercise the
/// degraded paths in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Anonymous pipes, for waking a blocked discovery loop.
    pub pipe: bool,
    /// BSD-style sockets (UDP and TCP).
    pub sockets: bool,
    /// IPv4 address conversion and resolution.
    pub inet: bool,
}

impl PlatformCapabilities {
    pub fn current() -> PlatformCapabilities {
        static CURRENT: OnceLock<PlatformCapabilities> = OnceLock::new();
        *CURRENT.get_or_init(Self::detect)
    }

    fn detect() -> PlatformCapabilities {
        let caps = PlatformCapabilities {
            pipe: cfg!(unix),
            sockets: !cfg!(target_family = "wasm"),
            inet: !cfg!(target_family = "wasm"),
        };
        log::debug!("Detected platform capabilities: {caps}");
        caps
    }

    /// No capabilities at all.
    pub fn none() -> PlatformCapabilities {
        PlatformCapabilities {
            pipe: false,
            sockets: false,
            inet: false,
        }
    }

    /// Fails with [`Error::Unsupported`] unless IPv4 sockets are available.
    pub fn require_sockets(&self) -> Result<()> {
        if !self.sockets {
            return Err(Error::Unsupported("sockets"));
        }
        if !self.inet {
            return Err(Error::Unsupported("IPv4 networking"));
        }
        Ok(())
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::current()
    }
}

impl std::fmt::Display for PlatformCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |b: bool| if b { "yes" } else { "no" };
        write!(
            f,
            "pipe: {}, sockets: {}, inet: {}",
            flag(self.pipe),
            flag(self.sockets),
            flag(self.inet)
        )
    }
}
