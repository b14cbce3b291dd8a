use crate::Cli;
use clap::Parser;
use maybe_async::maybe_async;
use netbios::{Client, SmbFamily, Status, TransportConfig};
use std::error::Error;

#[derive(Parser, Debug)]
pub struct ProbeCmd {
    /// Dotted IPv4 address or NetBIOS name of the server.
    pub host: String,

    /// Connects to SMB directly over TCP (port 445) instead of a NetBIOS session.
    #[arg(long)]
    pub direct: bool,
}

#[maybe_async]
pub async fn probe(cmd: &ProbeCmd, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut config = cli.make_client_config();
    if cmd.direct {
        config.session.transport = TransportConfig::DirectTcp;
    }
    let client = Client::new(config);
    let probe = client.probe(&cmd.host).await?;

    let family = match probe.family {
        SmbFamily::Smb1 => "SMB1",
        SmbFamily::Smb2 => "SMB2",
    };
    println!("{}: {family} server", cmd.host);
    println!("  status:  {}", Status::try_display_as_status(probe.status));
    if let Some(dialect) = probe.dialect_name() {
        println!("  dialect: {dialect}");
    }
    if let Some(guid) = probe.server_guid {
        let hex: String = guid.iter().map(|b| format!("{b:02x}")).collect();
        println!("  server guid: {hex}");
    }
    Ok(())
}
