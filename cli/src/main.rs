//! pcloudsh - operator shell for pacemaker-cloud

use std::process::ExitCode;

use clap::Parser;
use pcloud_cli::cli::{Cli, failure};
use pcloud_cli::output::json::format_error;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let (status, code) = failure(&e);
            let message = format!("{e:#}");
            match json.then(|| format_error(&message, code)) {
                Some(Ok(obj)) => println!("{obj}"),
                _ => eprintln!("Error: {message}"),
            }
            ExitCode::from(status)
        }
    }
}
