use crate::{Cli, cli::parse_suffix};
use clap::Parser;
use maybe_async::maybe_async;
use netbios::{Client, NameSuffix};
use std::error::Error;
use std::net::Ipv4Addr;

#[derive(Parser, Debug)]
pub struct ResolveCmd {
    /// The NetBIOS name to resolve.
    pub name: String,

    /// Name suffix, in hex.
    #[arg(short, long, value_parser = parse_suffix, default_value = "20")]
    pub suffix: u8,
}

#[derive(Parser, Debug)]
pub struct InverseCmd {
    pub address: Ipv4Addr,

    /// Name suffix, in hex.
    #[arg(short, long, value_parser = parse_suffix, default_value = "20")]
    pub suffix: u8,
}

#[maybe_async]
pub async fn resolve(cmd: &ResolveCmd, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let client = Client::new(cli.make_client_config());
    let suffix = NameSuffix(cmd.suffix);
    let address = client.resolve(&cmd.name, suffix).await?;
    println!("{}<{:02x}> {address}", cmd.name.to_uppercase(), suffix.0);
    Ok(())
}

#[maybe_async]
pub async fn inverse(cmd: &InverseCmd, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let client = Client::new(cli.make_client_config());
    let suffix = NameSuffix(cmd.suffix);
    let name = client.inverse(cmd.address, suffix).await?;
    println!("{} {name}<{:02x}>", cmd.address, suffix.0);
    Ok(())
}
