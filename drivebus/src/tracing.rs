//! Provide tracing, tailored to this library.
//!
//! Applications call [`init`] once at startup to install a subscriber;
//! library code includes `use crate::tracing::prelude::*` for the
//! `trace!()` through `error!()` macros. Byte-level bus traffic is logged
//! at TRACE, probe and lifecycle decisions at DEBUG.

use std::env;
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Install a tracing subscriber.
///
/// Under systemd, events go to journald; anywhere else, to stdout with a
/// compact local-time stamp, filtered by `RUST_LOG` (default INFO).
pub fn init() {
    if env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(layer) = tracing_journald::layer() {
            tracing_subscriber::registry().with(layer).init();
            return;
        }
        init_stdout();
        error!("Failed to initialize journald logging, using stdout.");
    } else {
        init_stdout();
    }
}

fn init_stdout() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_timer(HmsTimer))
        .init();
}

// Timestamps to the nearest second in local time; the default timer's
// long UTC strings drown the actual event text.
struct HmsTimer;

impl FormatTime for HmsTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        write!(
            w,
            "{}",
            now.format(time::macros::format_description!(
                "[hour]:[minute]:[second]"
            ))
            .unwrap(),
        )
    }
}
