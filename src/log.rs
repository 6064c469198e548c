/*!

Logging for the simulation engine.

The engine emits records through the [`log`](https://docs.rs/log) facade: `trace!` for
every patient event, `debug!` for per-patient and per-scenario summaries, `info!` for
cohort milestones. Nothing is printed unless a logger is installed. Call
[`enable_logging`] to install a `log4rs` console logger, and [`set_log_level`] to change
the level afterward. Building a scenario never logs anything on its own.

*/

pub use ::log::{LevelFilter, debug, error, info, trace, warn};

use log4rs::{
    Handle,
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use std::sync::{LazyLock, Mutex, MutexGuard};

const DEFAULT_LOG_PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";
const CONSOLE_APPENDER: &str = "stdout";

struct LogConfiguration {
    level: LevelFilter,
    handle: Option<Handle>,
}

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(|| {
    Mutex::new(LogConfiguration {
        level: LevelFilter::Off,
        handle: None,
    })
});

fn log_configuration() -> MutexGuard<'static, LogConfiguration> {
    // A poisoned lock only means another thread panicked while logging was being set up.
    LOG_CONFIGURATION
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn build_config(level: LevelFilter) -> Config {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN)))
        .build();

    Config::builder()
        .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(stdout)))
        .build(Root::builder().appender(CONSOLE_APPENDER).build(level))
        // The configuration is static and has exactly one appender, which the root uses.
        .expect("static log4rs configuration is valid")
}

/// Installs the console logger at `Info` level, or re-enables it if it was disabled.
pub fn enable_logging() {
    set_log_level(LevelFilter::Info);
}

/// Silences all output without uninstalling the logger.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the maximum level of records that reach the console.
pub fn set_log_level(level: LevelFilter) {
    let mut configuration = log_configuration();
    configuration.level = level;

    match configuration.handle.as_ref() {
        Some(handle) => handle.set_config(build_config(level)),
        None => match log4rs::init_config(build_config(level)) {
            Ok(handle) => configuration.handle = Some(handle),
            // Somebody else already installed a global logger; defer to it.
            Err(_) => ::log::set_max_level(level),
        },
    }
}

/// The level most recently requested through this module.
#[must_use]
pub fn log_level() -> LevelFilter {
    log_configuration().level
}
