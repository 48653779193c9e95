/*
================================================================================
                            BoxSkater Logging System
================================================================================

## 1. Application Logging

Normal logging through the `log` macros (debug!, info!, ...).
- `BufferLogger`: keeps the last 1000 formatted lines in memory
- `CompositeLogger`: console output (env_logger) plus the buffer
- `setup_logger()`: installs the composite logger with default filters
- `setup_panic_hook()`: writes a backtrace and the buffered lines to panic.log
- `export_debug_logs()`: dumps the buffer to debug.log on request

**Log Levels**:
- RUST_LOG, when set, wins
- Debug builds: DEBUG and above
- Release builds: INFO and above, so progress lines stay visible

## 2. Signals

- `setup_interrupt_handler()`: SIGINT/SIGTERM set a flag the annotation loop
  polls between events, so a run stops cleanly at the next poll
- `setup_signal_crash_handler()`: reports SIGSEGV and friends before exiting

**File Locations**: `<data_dir>/boxskater/logs/` via the dirs crate

================================================================================
*/

use std::panic;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::collections::VecDeque;
use std::path::PathBuf;
use env_logger::fmt::Color;
use log::{LevelFilter, Metadata, Record};
use env_logger::fmt::Formatter;
use chrono::Utc;

#[allow(unused_imports)]
use log::{Level, debug, info, warn, error};

pub type LogBuffer = Arc<Mutex<VecDeque<String>>>;

const MAX_LOG_LINES: usize = 1000;
const LOG_TARGET: &str = "boxskater";

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

struct BufferLogger {
    log_buffer: LogBuffer,
}

impl BufferLogger {
    fn new() -> Self {
        Self {
            log_buffer: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES))),
        }
    }

    fn log_to_buffer(&self, message: &str, target: &str, line: Option<u32>) {
        if !target.starts_with(LOG_TARGET) {
            return;
        }
        // A poisoned buffer only loses diagnostics
        let Ok(mut buffer) = self.log_buffer.lock() else {
            return;
        };
        if buffer.len() == MAX_LOG_LINES {
            buffer.pop_front();
        }

        let formatted_message = if let Some(line_num) = line {
            format!("{target}:{line_num} {message}")
        } else {
            format!("{target} {message}")
        };

        buffer.push_back(formatted_message);
    }

    fn get_shared_buffer(&self) -> LogBuffer {
        Arc::clone(&self.log_buffer)
    }
}

impl log::Log for BufferLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with(LOG_TARGET) && metadata.level() <= LevelFilter::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("{:<5} {}", record.level(), record.args());
            self.log_to_buffer(&message, record.target(), record.line());
        }
    }

    fn flush(&self) {}
}

struct CompositeLogger {
    console_logger: env_logger::Logger,
    buffer_logger: BufferLogger,
}

impl log::Log for CompositeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console_logger.enabled(metadata) || self.buffer_logger.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.console_logger.enabled(record.metadata()) {
            self.console_logger.log(record);
        }
        if self.buffer_logger.enabled(record.metadata()) {
            self.buffer_logger.log(record);
        }
    }

    fn flush(&self) {
        self.console_logger.flush();
        self.buffer_logger.flush();
    }
}

/// Installs the console + buffer logger. `verbose` forces DEBUG output even
/// in release builds unless RUST_LOG overrides it.
pub fn setup_logger(verbose: bool) -> LogBuffer {
    let buffer_logger = BufferLogger::new();
    let shared_buffer = buffer_logger.get_shared_buffer();

    let mut builder = env_logger::Builder::new();

    // Filter out all other crates' logs
    builder.filter(None, LevelFilter::Off);

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else if verbose || cfg!(debug_assertions) {
        builder.filter(Some(LOG_TARGET), LevelFilter::Debug);
    } else {
        builder.filter(Some(LOG_TARGET), LevelFilter::Info);
    }

    builder.format(|buf: &mut Formatter, record: &Record| {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");

        let module_info = if let (Some(module), Some(line)) = (record.module_path(), record.line()) {
            format!("{module}:{line}")
        } else if let Some(module) = record.module_path() {
            module.to_string()
        } else {
            "unknown".to_string()
        };

        let mut level_style = buf.style();
        let mut meta_style = buf.style();

        match record.level() {
            Level::Error => level_style.set_color(Color::Red).set_bold(true),
            Level::Warn => level_style.set_color(Color::Yellow).set_bold(true),
            Level::Info => level_style.set_color(Color::Green).set_bold(true),
            Level::Debug => level_style.set_color(Color::Blue).set_bold(true),
            Level::Trace => level_style.set_color(Color::White),
        };

        // Color::Rgb does not render on macOS terminals
        #[cfg(target_os = "macos")]
        {
            meta_style.set_color(Color::Blue);
        }
        #[cfg(not(target_os = "macos"))]
        {
            meta_style.set_color(Color::Rgb(120, 120, 120));
        }

        writeln!(
            buf,
            "{} {} {} {}",
            meta_style.value(timestamp),
            level_style.value(record.level()),
            meta_style.value(module_info),
            record.args()
        )
    });

    let composite_logger = CompositeLogger {
        console_logger: builder.build(),
        buffer_logger,
    };

    if let Err(e) = log::set_boxed_logger(Box::new(composite_logger)) {
        eprintln!("Failed to set logger: {e}");
    }
    log::set_max_level(LevelFilter::Trace);

    shared_buffer
}

pub fn get_log_directory() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(LOG_TARGET).join("logs")
}

fn snapshot(log_buffer: &LogBuffer) -> Vec<String> {
    match log_buffer.lock() {
        Ok(buffer) => buffer.iter().cloned().collect(),
        Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
    }
}

/// Writes the buffered log lines to `<log_dir>/debug.log`
pub fn export_debug_logs(log_buffer: &LogBuffer) -> std::io::Result<PathBuf> {
    let log_dir_path = get_log_directory();
    std::fs::create_dir_all(&log_dir_path)?;
    let debug_log_path = log_dir_path.join("debug.log");
    write_log_export(&debug_log_path, &snapshot(log_buffer))?;
    info!("Debug logs exported to: {}", debug_log_path.display());
    Ok(debug_log_path)
}

fn write_log_export(path: &std::path::Path, entries: &[String]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");
    writeln!(file, "{timestamp} [DEBUG EXPORT] BoxSkater debug log ({} entries, max {MAX_LOG_LINES})", entries.len())?;
    writeln!(file)?;
    for entry in entries {
        writeln!(file, "{timestamp} {entry}")?;
    }
    file.flush()
}

pub fn setup_panic_hook(log_buffer: LogBuffer) {
    let log_file_path = get_log_directory().join("panic.log");
    if let Some(parent) = log_file_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Failed to create log directory {}: {}", parent.display(), e);
        }
    }

    panic::set_hook(Box::new(move |info| {
        let backtrace = backtrace::Backtrace::new();
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");

        let location = if let Some(location) = info.location() {
            format!("{}:{}", location.file(), location.line())
        } else {
            "unknown location".to_string()
        };

        let header_msg = format!("[PANIC] at {location} - {info}");
        let backtrace_lines: Vec<String> = format!("{backtrace:?}")
            .lines()
            .map(|line| format!("[BACKTRACE] {}", line.trim()))
            .collect();

        let written = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_file_path)
            .and_then(|mut file| {
                writeln!(file, "{timestamp} {header_msg}")?;
                writeln!(file, "{timestamp} [PANIC] Backtrace:")?;
                for line in &backtrace_lines {
                    writeln!(file, "{timestamp} {line}")?;
                }
                writeln!(file)?;
                writeln!(file, "{timestamp} [PANIC] Last {MAX_LOG_LINES} log entries:")?;
                for log in snapshot(&log_buffer) {
                    writeln!(file, "{timestamp} {log}")?;
                }
                Ok(())
            });

        eprintln!("\n\n{header_msg}");
        eprintln!("[PANIC] Backtrace:");
        for line in &backtrace_lines {
            eprintln!("{line}");
        }
        match written {
            Ok(()) => eprintln!("\nA complete crash log has been written to: {}", log_file_path.display()),
            Err(e) => eprintln!("\nFailed to write crash log {}: {}", log_file_path.display(), e),
        }
    }));
}

/// Set once SIGINT/SIGTERM arrives
pub fn interrupt_flag() -> &'static AtomicBool {
    &INTERRUPTED
}

#[cfg(unix)]
pub fn setup_interrupt_handler() {
    extern "C" fn interrupt_handler(_signal: libc::c_int) {
        // Only async-signal-safe work here
        INTERRUPTED.store(true, Ordering::SeqCst);
    }

    unsafe {
        libc::signal(libc::SIGINT, interrupt_handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, interrupt_handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn setup_interrupt_handler() {
    // Ctrl+C terminates the process directly on other platforms
}

/// Reports low-level crashes that bypass the panic hook
#[cfg(unix)]
pub fn setup_signal_crash_handler() {
    extern "C" fn signal_handler(signal: libc::c_int) {
        let signal_name = match signal {
            libc::SIGSEGV => "SIGSEGV (segmentation fault)",
            libc::SIGBUS => "SIGBUS (bus error)",
            libc::SIGILL => "SIGILL (illegal instruction)",
            libc::SIGFPE => "SIGFPE (floating point exception)",
            _ => "UNKNOWN SIGNAL",
        };

        let _ = std::panic::catch_unwind(|| {
            eprintln!("CRASH_DEBUG: SIGNAL CAUGHT: {signal_name} ({signal})");
        });

        std::process::exit(128 + signal);
    }

    unsafe {
        libc::signal(libc::SIGSEGV, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGBUS, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGILL, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGFPE, signal_handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn setup_signal_crash_handler() {
    // Signal handling not implemented for non-Unix platforms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_keeps_last_lines_only() {
        let logger = BufferLogger::new();
        for i in 0..(MAX_LOG_LINES + 5) {
            logger.log_to_buffer(&format!("line {i}"), "boxskater::convert", Some(7));
        }
        let lines = snapshot(&logger.get_shared_buffer());
        assert_eq!(lines.len(), MAX_LOG_LINES);
        assert_eq!(lines[0], "boxskater::convert:7 line 5");
        assert_eq!(lines[MAX_LOG_LINES - 1], format!("boxskater::convert:7 line {}", MAX_LOG_LINES + 4));
    }

    #[test]
    fn test_buffer_ignores_foreign_targets() {
        let logger = BufferLogger::new();
        logger.log_to_buffer("noise", "quick_xml::de", None);
        logger.log_to_buffer("kept", "boxskater", None);
        assert_eq!(snapshot(&logger.get_shared_buffer()), vec!["boxskater kept".to_string()]);
    }

    #[test]
    fn test_write_log_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        write_log_export(&path, &["boxskater:1 INFO  hello".to_string()]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("1 entries"));
        assert!(content.ends_with("boxskater:1 INFO  hello\n"));
    }
}
