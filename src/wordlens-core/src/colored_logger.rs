//! Colored logging for the live pipeline
//!
//! A tracing formatter that prefixes every line with the component that
//! produced it, derived from the event's target crate.

use owo_colors::{OwoColorize, Style};
use std::fmt;
use std::io;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{
    format::{FormatEvent, FormatFields, Writer},
    FmtContext,
};
use tracing_subscriber::registry::LookupSpan;

/// Pipeline component shown in the log prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Main,
    Camera,
    Ocr,
    Lookup,
}

impl Component {
    /// Component owning a tracing target
    pub fn from_target(target: &str) -> Self {
        let crate_name = target.split("::").next().unwrap_or(target);
        match crate_name {
            "wordlens_capture" => Component::Camera,
            "wordlens_ocr" => Component::Ocr,
            "wordlens_db" => Component::Lookup,
            _ => Component::Main,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Main => "MAIN",
            Component::Camera => "CAMERA",
            Component::Ocr => "OCR",
            Component::Lookup => "LOOKUP",
        }
    }

    pub fn color_style(&self) -> Style {
        match self {
            Component::Main => Style::new().cyan().bold(),
            Component::Camera => Style::new().green().bold(),
            Component::Ocr => Style::new().yellow().bold(),
            Component::Lookup => Style::new().magenta().bold(),
        }
    }
}

/// Formatter with per-component prefixes and colors
pub struct ColoredFormatter;

impl<S, N> FormatEvent<S, N> for ColoredFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let now = chrono::Local::now();
        write!(writer, "{} ", now.format("%H:%M:%S%.3f").dimmed())?;

        let component = Component::from_target(metadata.target());
        let prefix = format!("[{:6}]", component.as_str());
        write!(writer, "{} ", prefix.style(component.color_style()))?;

        match *metadata.level() {
            Level::ERROR => write!(writer, "{} ", "ERROR".red().bold())?,
            Level::WARN => write!(writer, "{} ", "WARN ".yellow().bold())?,
            Level::INFO => write!(writer, "{} ", "INFO ".green().bold())?,
            Level::DEBUG => write!(writer, "{} ", "DEBUG".blue().bold())?,
            Level::TRACE => write!(writer, "{} ", "TRACE".dimmed().bold())?,
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Install the colored subscriber. `RUST_LOG` directives still apply on top of `level`.
pub fn init_colored_logger(level: Level) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(ColoredFormatter)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
