use crate::Cli;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use maybe_async::maybe_async;
use netbios::{Client, Discoverer, DiscoveryEvent, NsEntry};
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[cfg(not(feature = "async"))]
use std::thread::sleep;
#[cfg(feature = "async")]
use tokio::time::sleep;

#[derive(Parser, Debug)]
pub struct DiscoverCmd {
    /// How long to listen for answers, in milliseconds.
    #[arg(short, long, default_value_t = 2000)]
    pub wait: u64,

    /// Keep discovering, reporting hosts as they come and go, until Ctrl+C.
    #[arg(long)]
    pub watch: bool,

    /// With --watch: seconds after which an unseen host is reported gone.
    #[arg(long, default_value_t = 60)]
    pub expiry: u64,

    /// With --watch: seconds between discovery rounds.
    #[arg(long, default_value_t = 10)]
    pub interval: u64,
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_entry(prefix: &str, entry: &NsEntry) {
    println!("{prefix} {entry}");
}

#[maybe_async]
pub async fn discover(cmd: &DiscoverCmd, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let client = Client::new(cli.make_client_config());
    let wait = Duration::from_millis(cmd.wait);

    if !cmd.watch {
        let progress = spinner("Discovering hosts...");
        let entries = client.discover(wait).await;
        progress.finish_and_clear();
        let entries = entries?;
        for entry in &entries {
            print_entry(" ", entry);
        }
        log::info!("{} host(s) found", entries.len());
        return Ok(());
    }

    let stop = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler({
        let stop = stop.clone();
        move || {
            log::info!("Cancellation requested, stopping discovery...");
            stop.store(true, Ordering::SeqCst);
        }
    })?;

    let mut discoverer = Discoverer::new(wait, Duration::from_secs(cmd.expiry));
    while !stop.load(Ordering::SeqCst) {
        match discoverer.poll(client.name_service()).await {
            Ok(events) => {
                for event in events {
                    match event {
                        DiscoveryEvent::Added(entry) => print_entry("+", &entry),
                        DiscoveryEvent::Removed(entry) => print_entry("-", &entry),
                    }
                }
            }
            Err(e) => log::error!("Discovery round failed: {e}"),
        }

        // Sleep in short steps to notice Ctrl+C quickly.
        let mut slept = Duration::ZERO;
        let interval = Duration::from_secs(cmd.interval);
        while slept < interval && !stop.load(Ordering::SeqCst) {
            let step = Duration::from_millis(200);
            sleep(step).await;
            slept += step;
        }
    }
    Ok(())
}
