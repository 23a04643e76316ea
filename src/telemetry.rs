//! Logging setup.
//!
//! Installs a [tracing_subscriber] registry that prints events through an
//! ANSI coloured layer and bridges `log` records into `tracing`.

use std::fmt::{self, Write as _};

use ansi_term::{Colour, Style};
use eyre::Result;
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    EnvFilter, Layer, Registry,
};

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence. Otherwise logs at `info`, or `debug` when verbose.
pub fn init(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;
    let subscriber = Registry::default().with(filter).with(AnsiTermLayer);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

/// Logs and exits on ctrl-c.
pub fn register_shutdown() {
    let handler = ctrlc::set_handler(move || {
        tracing::info!(target: "spanout", "shutting down");
        std::process::exit(0);
    });
    if let Err(e) = handler {
        tracing::warn!(target: "spanout", "failed to register shutdown handler: {}", e);
    }
}

/// A [Layer] that prints one coloured line per event to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiTermLayer;

impl<S: Subscriber> Layer<S> for AnsiTermLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = AnsiVisitor::default();
        event.record(&mut visitor);

        let now = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
        eprintln!(
            "{} {} {}{}",
            Style::new().dimmed().paint(now.to_string()),
            level_style(metadata.level()).paint(format!("{:>5}", metadata.level())),
            Style::new().dimmed().paint(format!("{}: ", metadata.target())),
            visitor.line
        );
    }
}

fn level_style(level: &Level) -> Style {
    match *level {
        Level::ERROR => Colour::Red.bold(),
        Level::WARN => Colour::Yellow.bold(),
        Level::INFO => Colour::Green.bold(),
        Level::DEBUG => Colour::Blue.bold(),
        Level::TRACE => Colour::Purple.bold(),
    }
}

/// Collects an event's message and fields into a single line.
#[derive(Debug, Default)]
struct AnsiVisitor {
    line: String,
}

impl Visit for AnsiVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.line.insert_str(0, value);
        } else {
            let _ = write!(self.line, " {}={}", Colour::Cyan.paint(field.name()), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.line.insert_str(0, &format!("{value:?}"));
        } else {
            let _ = write!(self.line, " {}={:?}", Colour::Cyan.paint(field.name()), value);
        }
    }
}
