//! poolctl - worker pool operator client

mod cli;
mod config;
mod error;
mod logging;
mod models;
mod monitor;
mod output;
mod remote;
mod reset;
mod rpc;
mod theme;
pub mod version;

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::{OwoColorize, Stream::Stderr};
use tracing::{debug, info, warn};

use cli::{Cli, Commands, ResetArgs, WorkersArgs};
use logging::LogConfig;
use monitor::{IntervalTicker, REFRESH_INTERVAL, ShutdownFlag};
use output::{TableOptions, WorkerRenderer};
use remote::{Directory, PoolApi};
use reset::{LineSurface, ResetOptions, SpinnerSurface};
use rpc::{RpcClient, Transport};
use theme::Themed;

/// Program entry point: parses CLI arguments, dispatches the selected command, and handles top-level errors.
///
/// On error, prints a colored error header followed by each cause in the error
/// chain and exits with status code 1.
fn main() {
    let cli = Cli::parse();

    // Handle no-color flag - affects owo_colors, comfy_table and indicatif
    if cli.no_color {
        theme::disable_colors();
    }

    logging::init(LogConfig::for_verbosity(cli.verbosity()).with_env_overrides());

    let result = match &cli.command {
        Commands::Reset(args) => cmd_reset(&cli, args),
        Commands::Workers(args) => cmd_workers(&cli, args),
        Commands::Completions(args) => {
            args.generate();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!(
            "{}: {}",
            "error"
                .if_supports_color(Stderr, |text| text.red())
                .if_supports_color(Stderr, |text| text.bold()),
            e
        );
        // Print the error chain if there are causes
        for cause in e.chain().skip(1) {
            eprintln!(
                "  {}: {}",
                "caused by".if_supports_color(Stderr, |text| text.yellow()),
                cause
            );
        }
        std::process::exit(1);
    }
}

/// Dial the manager at the address picked from flags, env, or config file.
fn connect(cli: &Cli) -> Result<RpcClient> {
    let addr = config::resolve_rpc_address(cli.rpc_addr.as_deref(), cli.config.as_deref())
        .context("failed to determine RPC address")?;
    let timeout = (cli.rpc_timeout > 0).then(|| Duration::from_secs(cli.rpc_timeout));

    debug!(%addr, ?timeout, "connecting to manager");
    RpcClient::connect(&addr, timeout)
        .with_context(|| format!("failed to reach the manager at {addr}; is it running?"))
}

/// Run `f` against a fresh connection and close it afterwards, whatever `f` returned.
fn with_client<T>(cli: &Cli, f: impl FnOnce(&RpcClient) -> Result<T>) -> Result<T> {
    let client = connect(cli)?;
    let result = f(&client);
    if let Err(e) = client.close() {
        warn!(error = %e, addr = client.addr(), "failed to close RPC connection");
    }
    result
}

/// Reset every target pool concurrently.
///
/// Per-pool failures are shown next to the pool and do not fail the command;
/// only a failed pool listing does.
fn cmd_reset(cli: &Cli, args: &ResetArgs) -> Result<()> {
    with_client(cli, |client| {
        let api = PoolApi::new(client);
        let options = ResetOptions::default();
        let spinners = std::io::stderr().is_terminal() && !cli.quiet;

        let report = if spinners {
            let mut surface = SpinnerSurface::new(options.redraw_interval);
            reset::reset_pools(api, &args.pools, &mut surface, options)
        } else {
            let mut surface = LineSurface::new(std::io::stdout().lock(), cli.quiet);
            reset::reset_pools(api, &args.pools, &mut surface, options)
        }
        .context("failed to list pools")?;

        if report.outcomes.is_empty() && !cli.quiet {
            eprintln!("{}", "No pools to reset.".warning());
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "reset finished"
        );
        Ok(())
    })
}

/// Show worker tables once, or keep redrawing them until Ctrl+C with `-i`.
fn cmd_workers(cli: &Cli, args: &WorkersArgs) -> Result<()> {
    with_client(cli, |client| {
        let api = PoolApi::new(client);
        let pools = api
            .resolve_targets(&args.pools, Directory::Informer)
            .context("failed to list pools")?;
        debug!(?pools, interactive = args.interactive, "showing workers");

        let renderer = WorkerRenderer::new(
            std::io::stdout().lock(),
            args.format.into(),
            TableOptions { ascii: args.ascii },
        );

        if !args.interactive {
            let mut renderer = renderer;
            monitor::show_workers(api, &pools, &mut renderer)?;
            return Ok(());
        }

        // Ctrl+C also drops the connection so a fetch the manager never
        // answers cannot hold the process.
        let shutdown = ShutdownFlag::new();
        let on_interrupt = shutdown.clone();
        let interrupter = client
            .interrupter()
            .context("failed to prepare Ctrl+C handling")?;
        ctrlc::set_handler(move || {
            on_interrupt.request();
            interrupter.interrupt();
        })
        .context("failed to install Ctrl+C handler")?;

        let mut renderer = renderer.live(std::io::stdout().is_terminal());
        let mut ticker = IntervalTicker::new(REFRESH_INTERVAL);
        let frames = monitor::watch_workers(api, &pools, &mut renderer, &mut ticker, &shutdown)?;
        info!(frames, "live view closed");
        Ok(())
    })
}
