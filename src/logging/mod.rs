// Logging module for structured logging using the tracing crate

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable compact lines
    #[default]
    Text,
    /// One JSON object per event, for log aggregation
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    pub format: LogFormat,
    /// 0 = info, 1 = debug, 2+ = trace
    pub verbosity: u8,
}

impl LogOptions {
    fn default_directive(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// `RUST_LOG` wins over the verbosity flag when set.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

/// Initialize the tracing subscriber.
///
/// Events go to stderr so stdout only carries the run report. Calling this
/// more than once is a no-op.
///
/// # Examples
///
/// ```
/// use watermill::logging::{init_subscriber, LogOptions};
///
/// init_subscriber(LogOptions::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(options: LogOptions) -> Result<(), Box<dyn Error + Send + Sync>> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(options.env_filter())
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match options.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.compact().try_init(),
    };

    if let Err(e) = result {
        INITIALIZED.store(false, Ordering::SeqCst);
        return Err(e);
    }
    Ok(())
}
