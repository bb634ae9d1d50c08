use log::{error, info, LevelFilter};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

static CRASH_LOG_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);
static SENTRY_GUARD: Mutex<Option<sentry::ClientInitGuard>> = Mutex::new(None);

const CRASH_LOG_DIR: &str = "JShellBridge";
const CRASH_LOG_FILE: &str = "rust_crash.log";

/// Initialize Sentry reporting. An absent or empty DSN leaves it disabled.
pub fn init_sentry(dsn: Option<&str>, environment: Option<&str>) -> bool {
    let dsn = match dsn {
        Some(d) if !d.trim().is_empty() => d,
        _ => {
            info!("[SENTRY] No DSN provided - Sentry disabled");
            return false;
        }
    };

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: environment.map(|e| std::borrow::Cow::Owned(e.to_string())),
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    if !guard.is_enabled() {
        info!("[SENTRY] Failed to initialize");
        return false;
    }

    *SENTRY_GUARD.lock().unwrap_or_else(|e| e.into_inner()) = Some(guard);
    info!("[SENTRY] Initialized - Environment: {:?}", environment);
    true
}

pub fn is_sentry_enabled() -> bool {
    SENTRY_GUARD
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
        .map_or(false, |g| g.is_enabled())
}

/// Flush pending events and end the Sentry session.
pub fn shutdown_sentry() {
    let guard = SENTRY_GUARD.lock().unwrap_or_else(|e| e.into_inner()).take();
    if let Some(guard) = guard {
        info!("[SENTRY] Shutting down - flushing events");
        drop(guard);
    }
}

/// Report an error that leaves the bridge unusable.
pub fn capture_critical_error(context: &str, error: &str) {
    if !is_sentry_enabled() {
        return;
    }
    sentry::with_scope(
        |scope| {
            scope.set_tag("error_type", "critical");
            scope.set_tag("context", context);
        },
        || {
            sentry::capture_message(
                &format!("[CRITICAL] {}: {}", context, error),
                sentry::Level::Fatal,
            );
        },
    );
}

/// Initialize env_logger; defaults to `warn` unless `RUST_LOG` is set.
pub fn init_logger() {
    let mut builder = env_logger::Builder::from_default_env();

    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(LevelFilter::Warn);
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
    });

    let _ = builder.try_init();
}

/// Install a panic hook that appends reports to the crash log.
pub fn init_crash_logger() {
    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join(CRASH_LOG_DIR))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = fs::create_dir_all(&log_dir);
    let log_path = log_dir.join(CRASH_LOG_FILE);

    *CRASH_LOG_PATH.lock().unwrap_or_else(|e| e.into_inner()) = Some(log_path.clone());

    std::panic::set_hook(Box::new(|panic_info| {
        let report = format_panic_report(panic_info);

        if is_sentry_enabled() {
            sentry::capture_message(&report, sentry::Level::Fatal);
        }
        if let Err(e) = append_crash_log(&report) {
            error!("[CRASH LOGGER] Failed to write crash log: {}", e);
        }
        error!("\n{}", report);
    }));

    info!("[CRASH LOGGER] Initialized - Log: {:?}", log_path);
}

fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

fn thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string()
}

fn format_panic_report(panic_info: &std::panic::PanicHookInfo) -> String {
    let payload = panic_info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unknown panic payload".to_string());

    let location = panic_info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "Unknown location".to_string());

    format!(
        "\n===== RUST PANIC =====\nTimestamp: {}\nLocation: {}\nMessage: {}\nThread: {}\n\nBacktrace:\n{}\n",
        timestamp(),
        location,
        payload,
        thread_name(),
        std::backtrace::Backtrace::capture()
    )
}

fn append_crash_log(message: &str) -> std::io::Result<()> {
    let path = CRASH_LOG_PATH
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    if let Some(path) = path {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", message)?;
    }
    Ok(())
}

/// Record a non-panicking failure in the crash log and Sentry.
pub fn log_critical_error(context: &str, error: &str) {
    let message = format!(
        "\n===== CRITICAL ERROR =====\nTimestamp: {}\nContext: {}\nError: {}\nThread: {}\n",
        timestamp(),
        context,
        error,
        thread_name()
    );

    capture_critical_error(context, error);

    if let Err(e) = append_crash_log(&message) {
        error!("[CRASH LOGGER] Failed to write critical error: {}", e);
    }
    error!("{}", message);
}

pub fn get_crash_log_path() -> Option<String> {
    CRASH_LOG_PATH
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
}

pub fn clear_crash_log() -> std::io::Result<()> {
    let path = CRASH_LOG_PATH
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    match path {
        Some(path) if path.exists() => fs::remove_file(path),
        _ => Ok(()),
    }
}
