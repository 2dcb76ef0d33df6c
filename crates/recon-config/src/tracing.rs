use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use ::tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable pointing at a Chrome trace output file.
pub const CHROME_TRACE_ENV: &str = "RECON_TRACE_CHROME";

/// Filter directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

static INITIALISED: OnceLock<()> = OnceLock::new();
static CHROME_GUARD: OnceLock<Mutex<Option<tracing_chrome::FlushGuard>>> = OnceLock::new();
static ENSURE_GUARD: OnceLock<Result<(), InitError>> = OnceLock::new();

/// Configures the global tracing subscriber.
///
/// Installs an [`EnvFilter`] (from `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`]) and a `fmt` layer. When [`CHROME_TRACE_ENV`] names a
/// path, a Chrome trace layer is stacked on top and its flush guard is kept
/// alive for the remainder of the process.
pub fn init_tracing() -> Result<(), InitError> {
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    let ansi = std::io::stdout().is_terminal();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(ansi);

    match chrome_trace_path()? {
        Some(path) => {
            let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file(path)
                .include_args(true)
                .build();
            let cell = CHROME_GUARD.get_or_init(|| Mutex::new(None));
            if let Ok(mut slot) = cell.lock() {
                *slot = Some(guard);
            }
            Registry::default()
                .with(filter)
                .with(fmt_layer)
                .with(chrome_layer)
                .try_init()
                .map_err(|err| InitError::Subscriber(err.to_string()))?;
        }
        None => {
            Registry::default()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|err| InitError::Subscriber(err.to_string()))?;
        }
    }

    Ok(())
}

/// Ensures tracing has been initialised for the current process.
///
/// Repeated calls are no-ops. Failures other than a previous initialisation
/// are reported once through `warn!` rather than surfaced to the caller.
pub fn ensure_tracing() {
    let result = ENSURE_GUARD.get_or_init(|| match init_tracing() {
        Ok(()) => Ok(()),
        Err(InitError::AlreadyInitialised) => Ok(()),
        Err(err) => Err(err),
    });

    if let Err(err) = result {
        warn!("failed to initialise tracing subscriber: {err}");
    }
}

/// Flushes the Chrome trace file, if one is being written.
pub fn flush_chrome_trace() {
    if let Some(cell) = CHROME_GUARD.get() {
        if let Ok(slot) = cell.lock() {
            if let Some(guard) = slot.as_ref() {
                guard.flush();
            }
        }
    }
}

fn chrome_trace_path() -> Result<Option<PathBuf>, InitError> {
    parse_chrome_trace_path(std::env::var(CHROME_TRACE_ENV))
}

fn parse_chrome_trace_path(
    raw: Result<String, std::env::VarError>,
) -> Result<Option<PathBuf>, InitError> {
    match raw {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(PathBuf::from(raw.trim()))),
        Ok(_) => Ok(None),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(InitError::Env(err)),
    }
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read RECON_TRACE_CHROME: {0}")]
    Env(std::env::VarError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::VarError;

    #[test]
    fn blank_chrome_path_is_ignored() {
        assert_eq!(parse_chrome_trace_path(Ok("   ".into())).unwrap(), None);
        assert_eq!(parse_chrome_trace_path(Err(VarError::NotPresent)).unwrap(), None);
    }

    #[test]
    fn chrome_path_is_trimmed() {
        let path = parse_chrome_trace_path(Ok(" /tmp/recon.json ".into())).unwrap();
        assert_eq!(path, Some(PathBuf::from("/tmp/recon.json")));
    }

    #[test]
    fn non_unicode_chrome_path_is_an_error() {
        let err = parse_chrome_trace_path(Err(VarError::NotUnicode("x".into()))).unwrap_err();
        assert!(matches!(err, InitError::Env(_)));
    }
}
