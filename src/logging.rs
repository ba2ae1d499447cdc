//! Log setup for the proxy process.
//!
//! Everything goes to stdout in compact form. A second, ANSI-free copy goes to a file:
//!
//! | `VECPROXY_LOG_FILE` | File layer |
//! |---|---|
//! | unset | `logs/vecproxy.log`, directory created on demand |
//! | a path | appended to that path |
//! | `off` | disabled; stdout only |
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "VECPROXY_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "vecproxy.log";

// Dropping the guard stops the background writer, so it lives as long as the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, PartialEq, Eq)]
enum FileTarget {
    Default,
    Path(PathBuf),
    Disabled,
}

impl FileTarget {
    fn from_setting(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            None | Some("") => Self::Default,
            Some(off) if off.eq_ignore_ascii_case("off") => Self::Disabled,
            Some(path) => Self::Path(PathBuf::from(path)),
        }
    }

    fn open(self) -> Option<NonBlocking> {
        let (writer, guard) = match self {
            Self::Disabled => return None,
            Self::Default => {
                if let Err(err) = fs::create_dir_all(DEFAULT_LOG_DIR) {
                    eprintln!("vecproxy: cannot create {DEFAULT_LOG_DIR}/: {err}");
                    return None;
                }
                tracing_appender::non_blocking(tracing_appender::rolling::never(
                    DEFAULT_LOG_DIR,
                    DEFAULT_LOG_FILE,
                ))
            }
            Self::Path(path) => match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => tracing_appender::non_blocking(file),
                Err(err) => {
                    eprintln!("vecproxy: cannot open log file {}: {err}", path.display());
                    return None;
                }
            },
        };
        let _ = FILE_GUARD.set(guard);
        Some(writer)
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` filters both layers and defaults to `info`. A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = FileTarget::from_setting(std::env::var(LOG_FILE_VAR).ok())
        .open()
        .map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .compact()
        });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_target_follows_setting() {
        assert_eq!(FileTarget::from_setting(None), FileTarget::Default);
        assert_eq!(FileTarget::from_setting(Some(" ".into())), FileTarget::Default);
        assert_eq!(FileTarget::from_setting(Some("OFF".into())), FileTarget::Disabled);
        assert_eq!(
            FileTarget::from_setting(Some("/tmp/proxy.log".into())),
            FileTarget::Path(PathBuf::from("/tmp/proxy.log"))
        );
    }

    #[test]
    fn disabled_target_opens_nothing() {
        assert!(FileTarget::Disabled.open().is_none());
    }
}
