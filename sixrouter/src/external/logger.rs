use crate::config::ConfigError;
use chrono::Timelike;
use std::str::FromStr;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct SystemTime;

impl FormatTime for SystemTime {
    fn format_time(&self, w: &mut Writer<'_>) -> core::fmt::Result {
        let time = chrono::prelude::Local::now();
        write!(
            w,
            "{:02}:{:02}:{:02}.{:03}",
            time.hour() % 24,
            time.minute(),
            time.second(),
            time.timestamp_subsec_millis()
        )
    }
}

/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(level: LevelFilter) -> Result<(), ConfigError> {
    let stdout_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stdout)
        .with_timer(SystemTime);
    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(
            EnvFilter::builder()
                .with_default_directive(default_directive(level)?)
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|_| ConfigError::Internal("Tracing subscriber already set"))
}

fn default_directive(level: LevelFilter) -> Result<Directive, ConfigError> {
    Directive::from_str(&format!("sixrouter={}", level))
        .map_err(|_| ConfigError::Internal("Tracing filter"))
}
