use clap::Parser;
use cli::{Cli, Commands};
use maybe_async::maybe_async;
use netbios::{PlatformCapabilities, ResultCode};
use std::error::Error;
use std::process::ExitCode;

mod cli;
mod discover;
mod probe;
mod resolve;
mod status;

#[maybe_async]
async fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Commands::Resolve(cmd) => resolve::resolve(cmd, cli).await,
        Commands::Inverse(cmd) => resolve::inverse(cmd, cli).await,
        Commands::Status(cmd) => status::status(cmd, cli).await,
        Commands::Discover(cmd) => discover::discover(cmd, cli).await,
        Commands::Probe(cmd) => probe::probe(cmd, cli).await,
        Commands::Capabilities => {
            let capabilities = cli
                .make_client_config()
                .capabilities
                .unwrap_or_else(PlatformCapabilities::current);
            println!("{capabilities}");
            Ok(())
        }
    }
}

/// Exits with the negated result code of the failure, if any.
fn finish(result: Result<(), Box<dyn Error>>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<netbios::Error>()
                .map_or(ResultCode::GenericError, ResultCode::from);
            log::error!("{e} [{code}]");
            ExitCode::from(code.exit_code())
        }
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(feature = "async")]
#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    finish(run(&cli).await)
}

#[cfg(not(feature = "async"))]
fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    finish(run(&cli))
}
