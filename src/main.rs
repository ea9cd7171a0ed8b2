use anyhow::Context;
use std::process::ExitCode;
use watermill::batch::{CancelToken, RunSummary};
use watermill::cli::{Args, ReportFormat};
use watermill::config::Config;

/// Exit code for configuration and usage errors.
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse_args();

    if let Err(e) = watermill::logging::init_subscriber(args.log_options()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Watermark run aborted");
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<RunSummary> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply(args.overrides());

    let plan = config
        .resolve(&args.input)
        .context("Invalid watermark settings")?;

    tracing::info!(
        config_file = ?args.config,
        input = %args.input.display(),
        position = %plan.spec.position,
        output = ?plan.policy,
        format = %plan.output_options.format,
        jobs = plan.jobs,
        "Configuration loaded successfully"
    );

    let cancel = CancelToken::new();
    register_shutdown_signals(&cancel)?;

    let processor = plan
        .into_processor()
        .context("Failed to prepare watermark")?
        .cancel_token(cancel);

    let summary = processor
        .run(&args.input)
        .with_context(|| format!("Cannot process {}", args.input.display()))?;

    match args.report {
        ReportFormat::Text => println!("{}", summary),
        ReportFormat::Json => println!("{}", summary.to_json().context("Failed to encode report")?),
    }

    if summary.cancelled {
        tracing::warn!(skipped = summary.skipped, "Run was interrupted");
    }

    Ok(summary)
}

/// First SIGINT/SIGTERM stops the run after the current files; a second one
/// exits immediately.
fn register_shutdown_signals(cancel: &CancelToken) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::flag;

    for signal in [SIGINT, SIGTERM] {
        flag::register_conditional_shutdown(signal, 130, cancel.flag())
            .with_context(|| format!("Failed to register handler for signal {}", signal))?;
        flag::register(signal, cancel.flag())
            .with_context(|| format!("Failed to register handler for signal {}", signal))?;
    }

    Ok(())
}
