use std::time::{Duration, Instant};

use colored::*;
use indicatif::ProgressStyle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Span;
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::terminal::logging::NmaprFormatter;
use crate::terminal::print::PRINT_TARGET;

const TICK: Duration = Duration::from_millis(100);
const TIP_DURATION: Duration = Duration::from_secs(3);
const TIPS: &[&str] = &["You can press 'q' to cancel the scan", "Ctrl-C also stops the scanner"];

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ])
}

/// Installs the global subscriber. `RUST_LOG` overrides the default level;
/// printed output is never filtered out.
pub fn init_logging(q_level: u8) {
    let indicatif_layer = IndicatifLayer::new().with_progress_style(spinner_style());

    let level = match q_level {
        0 => "info",
        _ => "warn",
    };
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| level.to_string());
    let filter = EnvFilter::new(format!("{directives},{PRINT_TARGET}=info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(NmaprFormatter)
        .with_writer(indicatif_layer.get_stdout_writer());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(indicatif_layer)
        .init();
}

/// Animates the spinner attached to `span` until `done` fires.
pub fn start_scan_spinner(span: Span, done: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start_time = Instant::now();
        let mut ticker = tokio::time::interval(TICK);

        while !done.is_cancelled() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = done.cancelled() => break,
            }

            let elapsed = start_time.elapsed();
            let tip_index = (elapsed.as_secs() / TIP_DURATION.as_secs()) as usize;
            let tip = TIPS[tip_index % TIPS.len()];
            span.pb_set_message(&format!(
                "Scanning for {}  {}",
                format!("{:.1}s", elapsed.as_secs_f64()).yellow().bold(),
                tip.italic().white()
            ));
        }
    })
}
