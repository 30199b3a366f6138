use clap::error::ErrorKind;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use netscan::cli::{Cli, OutputFormat};
use netscan::config::{AppSettings, ScanSettings};
use netscan::error::{CliError, CliResult};
use netscan::neighbor::{NeighborSource, SystemNeighbors};
use netscan::output;
use netscan::probe::ProbeRegistry;
use netscan::scanner::ScanOrchestrator;
use netscan::types::AddressRange;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = e.print();
            return code;
        }
    };

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays clean for JSON/CSV. `RUST_LOG` wins
/// over the verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "netscan=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli)?;
    let range = AddressRange::parse(&cli.target, settings.address_policy).map_err(CliError::from)?;

    if settings.probes.icmp && !is_root() {
        output::print_warning(
            "ICMP echo without root relies on unprivileged ping sockets; results may be incomplete.",
        );
    }
    if !settings.probes.any_active() {
        output::print_warning("No active probe selected; only the ARP table will be read.");
    }

    let orchestrator = ScanOrchestrator::new(ProbeRegistry::from_settings(&settings), &settings);
    let system_neighbors = SystemNeighbors;
    let neighbors: Option<&dyn NeighborSource> = if settings.probes.neighbors {
        Some(&system_neighbors as &dyn NeighborSource)
    } else {
        None
    };

    let plain = cli.output == OutputFormat::Plain;
    if plain {
        output::print_scan_header(
            &range.to_string(),
            &orchestrator.step_names(neighbors.is_some()),
            settings.threads,
        );
    }

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let progress = plain.then(|| progress_bar(range.host_count()));
    let report = orchestrator
        .run(&range, neighbors, &cancel, progress.as_ref())
        .await;

    if let Some(pb) = progress {
        if report.interrupted {
            pb.abandon_with_message("Interrupted!");
        } else {
            pb.finish_with_message("Finished!");
        }
    }

    output::print_report(&report, cli.output).map_err(CliError::from)?;
    Ok(())
}

/// Persistent settings overlaid with the command-line flags.
fn load_settings(cli: &Cli) -> CliResult<ScanSettings> {
    let app = match &cli.config {
        Some(path) => AppSettings::load_from(path)?,
        None => AppSettings::load()?,
    };

    let mut settings = ScanSettings::from_app(&app, cli.probe_selection());
    if let Some(threads) = cli.threads {
        settings = settings.with_threads(threads as usize);
    }
    if let Some(ms) = cli.timeout {
        settings = settings.with_timeout(Duration::from_millis(ms));
    }
    Ok(settings)
}

fn progress_bar(hosts: u32) -> ProgressBar {
    let pb = ProgressBar::new(u64::from(hosts));
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=>-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Cancel the scan on Ctrl-C or SIGTERM.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("interrupt received, stopping scan");
        cancel.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn is_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
