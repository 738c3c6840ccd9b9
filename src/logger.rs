use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::{Result as IoResult, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static VERBOSE: AtomicBool = AtomicBool::new(false);
thread_local! {
    static LOG_SCOPE: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Joins the active scopes, outermost first, in front of `message`.
fn scoped(message: &str) -> String {
    LOG_SCOPE.with(|scope| {
        let scope = scope.borrow();
        if scope.is_empty() {
            message.to_owned()
        } else {
            format!("{}: {message}", scope.join("/"))
        }
    })
}

fn emit(level: Level, message: &str) {
    let line = scoped(message);
    eprintln!("{line}");
    if let Some(file) = LOG_FILE.get()
        && let Ok(mut file) = file.lock()
    {
        let _ = writeln!(file, "{level}: {line}");
    }
}

/// Mirrors every message into `path` as well as stderr.
///
/// Only the first successful call takes effect.
///
/// # Errors
///
/// Returns an error if the file or its parent directory cannot be created.
pub fn set_log_file(path: &Path) -> IoResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let _ = LOG_FILE.set(Mutex::new(file));
    Ok(())
}

/// Enables or disables informational messages (`log_info`).
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

#[must_use]
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Pushes a scope onto this thread's log prefix until the guard drops.
///
/// Nested scopes render as `outer/inner: message`.
pub fn set_log_prefix(prefix: impl Into<String>) -> LogPrefixGuard {
    LOG_SCOPE.with(|scope| scope.borrow_mut().push(prefix.into()));
    LogPrefixGuard { _private: () }
}

#[must_use = "the prefix is removed when the guard is dropped"]
pub struct LogPrefixGuard {
    _private: (),
}

impl Drop for LogPrefixGuard {
    fn drop(&mut self) {
        LOG_SCOPE.with(|scope| {
            scope.borrow_mut().pop();
        });
    }
}

pub fn log_info(message: &str) {
    if is_verbose() {
        emit(Level::Info, message);
    }
}

pub fn log_warn(message: &str) {
    emit(Level::Warning, message);
}

pub fn log_error(message: &str) {
    emit(Level::Error, message);
}
