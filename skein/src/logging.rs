// Logging setup for Skein
//
// Skein emits structured events through `tracing`. Nothing is printed until the host
// application installs a subscriber; the helpers below install a `tracing-subscriber`
// stack tuned for common environments.
//
// # Usage Examples
//
// ```rust
// use skein::logging;
//
// // INFO level, human-readable console output
// logging::init_default();
//
// // Or pick the level and format explicitly
// let config = logging::LogConfig {
//     level: tracing::Level::DEBUG,
//     json_format: false,
//     ..Default::default()
// };
// logging::init(config);
// ```
//
// Unit lifecycle events (spawn, dispatch, destroy) are logged at DEBUG under the `skein`
// target; join bookkeeping is logged at TRACE. Worker threads run inside a `skein_worker`
// span carrying the unit id and pool index.

use std::io;
use std::sync::Once;

use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[doc(hidden)]
pub use tracing;

/// Configuration for the Skein logging setup
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id
    pub show_thread_info: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            target_filters: None,
        }
    }
}

// Initialization guard to ensure we only initialize once
static INIT: Once = Once::new();

fn env_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());
    if let Some(filters) = &config.target_filters {
        for filter in filters.split(',') {
            if let Ok(directive) = filter.trim().parse() {
                env_filter = env_filter.add_directive(directive);
            }
        }
    }
    env_filter
}

/// Initialize the global subscriber with the given configuration
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(env_filter(&config));

        let subscriber: Box<dyn Subscriber + Send + Sync> = if config.json_format {
            Box::new(registry.with(fmt::layer().json().flatten_event(true)))
        } else {
            Box::new(
                registry.with(
                    fmt::layer()
                        .with_ansi(atty::is(atty::Stream::Stdout))
                        .with_file(config.show_file_line)
                        .with_line_number(config.show_file_line)
                        .with_thread_names(config.show_thread_info)
                        .with_thread_ids(config.show_thread_info),
                ),
            )
        };

        set_global_subscriber(subscriber);
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Opens `path` for appending, creating it if needed
pub fn file_writer(path: &str) -> io::Result<std::fs::File> {
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize logging to both the console and `log_file`
///
/// The file is opened up front so a bad path is reported to the caller. File output never
/// carries ANSI colors and always includes file, line and thread information.
pub fn init_with_file(config: LogConfig, log_file: &str) -> io::Result<()> {
    let file = file_writer(log_file)?;
    INIT.call_once(move || {
        let console_layer = fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(console_layer)
            .with(file_layer);

        set_global_subscriber(subscriber);
    });
    Ok(())
}

/// INFO level, human-readable console output
pub fn init_default() {
    init(LogConfig::default());
}

/// DEBUG level with TRACE for join bookkeeping, colored output with file/line information
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        target_filters: Some("skein=trace".to_string()),
        ..LogConfig::default()
    });
}

/// INFO level JSON output without file/line information
pub fn init_production() {
    init(LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        target_filters: None,
    });
}

/// WARN level plain output to keep test logs quiet
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        target_filters: None,
    });
}

/// Create a span for operations on one unit
///
/// ```rust
/// use skein::unit_span;
///
/// let span = unit_span!("unit-1");
/// let _guard = span.enter();
///
/// let span = unit_span!("unit-2", position = 3);
/// ```
#[macro_export]
macro_rules! unit_span {
    ($id:expr) => {
        $crate::logging::tracing::debug_span!("unit", id = %$id)
    };
    ($id:expr, $($fields:tt)*) => {
        $crate::logging::tracing::debug_span!("unit", id = %$id, $($fields)*)
    };
}

/// Log a unit lifecycle event
///
/// ```rust
/// use skein::log_lifecycle;
///
/// log_lifecycle!("unit-1", "dispatched");
/// log_lifecycle!("unit-1", "spawned", position = 2);
/// ```
#[macro_export]
macro_rules! log_lifecycle {
    ($id:expr, $event:expr) => {
        $crate::logging::tracing::debug!(unit = %$id, event = $event)
    };
    ($id:expr, $event:expr, $($fields:tt)*) => {
        $crate::logging::tracing::debug!(unit = %$id, event = $event, $($fields)*)
    };
}

/// Log a pool-wide operation and its outcome
///
/// ```rust
/// use skein::log_pool;
///
/// log_pool!(4, "dispatch", "busy");
/// log_pool!(4, "join_at_least", "ok", count = 2);
/// ```
#[macro_export]
macro_rules! log_pool {
    ($size:expr, $operation:expr, $outcome:expr) => {
        $crate::logging::tracing::debug!(pool_size = $size, operation = $operation, outcome = $outcome)
    };
    ($size:expr, $operation:expr, $outcome:expr, $($fields:tt)*) => {
        $crate::logging::tracing::debug!(pool_size = $size, operation = $operation, outcome = $outcome, $($fields)*)
    };
}

// Re-export the most commonly used tracing macros for convenience
pub use tracing::{debug, error, info, trace, warn};
