use crate::{discover::DiscoverCmd, probe::ProbeCmd, resolve::*, status::StatusCmd};
use clap::{Parser, Subcommand};
use netbios::{ClientConfig, NameServiceConfig, SessionConfig};
use std::net::Ipv4Addr;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "nbt", version, about, long_about = None)]
pub struct Cli {
    /// Timeout of a single network operation, in milliseconds.
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Broadcast address for name queries and discovery.
    #[arg(long)]
    pub broadcast: Option<Ipv4Addr>,
    /// Never broadcast name queries; requires --wins.
    #[arg(long)]
    pub no_broadcast: bool,
    /// WINS server to query before broadcasting.
    #[arg(long)]
    pub wins: Option<Ipv4Addr>,

    /// Session service port, overriding 139 (or 445 with --direct).
    #[arg(long)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn make_client_config(&self) -> ClientConfig {
        let timeout = self.timeout.map(Duration::from_millis);
        let defaults = NameServiceConfig::default();
        ClientConfig {
            name_service: NameServiceConfig {
                timeout: timeout.unwrap_or(defaults.timeout),
                wins_server: self.wins,
                broadcast: !self.no_broadcast,
                broadcast_address: self.broadcast.unwrap_or(defaults.broadcast_address),
                ..defaults
            },
            session: SessionConfig {
                port: self.port,
                timeout: timeout.unwrap_or(SessionConfig::default().timeout),
                ..Default::default()
            },
            capabilities: None,
        }
    }
}

/// Parses a name suffix given in hex, with or without `0x`.
pub fn parse_suffix(s: &str) -> Result<u8, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid suffix {s}: {e}"))
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolves a NetBIOS name to an address.
    Resolve(ResolveCmd),
    /// Looks up the name a host registered.
    Inverse(InverseCmd),
    /// Lists the name table of a host.
    Status(StatusCmd),
    /// Finds the hosts on the local network.
    Discover(DiscoverCmd),
    /// Opens a session and probes the SMB server behind it.
    Probe(ProbeCmd),
    /// Shows the transport primitives this platform offers.
    Capabilities,
}
