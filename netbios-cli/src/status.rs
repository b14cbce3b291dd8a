use crate::Cli;
use clap::Parser;
use maybe_async::maybe_async;
use netbios::{Client, NodeName};
use std::error::Error;
use std::net::Ipv4Addr;

#[derive(Parser, Debug)]
pub struct StatusCmd {
    pub address: Ipv4Addr,
}

fn describe(entry: &NodeName) -> String {
    let kind = if entry.is_group() { "GROUP" } else { "UNIQUE" };
    let mut state = Vec::new();
    if entry.flags.active() {
        state.push("active");
    }
    if entry.flags.permanent() {
        state.push("permanent");
    }
    if entry.flags.conflict() {
        state.push("conflict");
    }
    if entry.flags.deregistering() {
        state.push("deregistering");
    }
    format!(
        "{:<15} <{:02x}> {:<6} {:?} {}",
        entry.name.name(),
        entry.name.suffix().0,
        kind,
        entry.owner_node_type(),
        state.join(",")
    )
}

#[maybe_async]
pub async fn status(cmd: &StatusCmd, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let client = Client::new(cli.make_client_config());
    let status = client.node_status(cmd.address).await?;

    println!("Name table of {}:", cmd.address);
    for entry in &status.names {
        match entry.name.suffix().description() {
            Some(description) => println!("  {}  {description}", describe(entry)),
            None => println!("  {}", describe(entry)),
        }
    }
    match status.mac_address() {
        Some(mac) => println!(
            "MAC address: {}",
            mac.iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(":")
        ),
        None => println!("MAC address: unknown"),
    }
    Ok(())
}
