//! Storefront catalog seeder
//!
//! Usage:
//!   storefront-seeder --db catalog.db seed products.json
//!   storefront-seeder --db catalog.db export --out snapshot.json
//!   storefront-seeder --db catalog.db sync --snapshot snapshot.json --mode full-replace
//!
//! Ctrl-C stops a running sync between records; the partial report is still
//! printed. `RUST_LOG` sets the log filter unless `--verbose` is given.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use storefront_seeder::{Cli, execute, log_filter};
use storefront_sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    FmtSubscriber::builder()
        .with_env_filter(log_filter(cli.verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current record");
            on_interrupt.cancel();
        }
    });

    let output = execute(&cli, &cancel).await?;
    println!("{}", output.json);

    Ok(if output.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
