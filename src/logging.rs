//! `log` backend: browser console on wasm, `env_logger` everywhere else.

use log::{LevelFilter, Metadata, Record};
#[cfg(target_arch = "wasm32")]
use log::Level;

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub struct ConsoleLogger {
    level: LevelFilter,
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
static LOGGER: ConsoleLogger = ConsoleLogger {
    level: LevelFilter::Info,
};

/// Install the console logger. Calling it twice is harmless.
#[cfg(target_arch = "wasm32")]
pub fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LOGGER.level);
    }
}

/// Install `env_logger` (`RUST_LOG`, default `info`). Calling it twice is harmless.
#[cfg(not(target_arch = "wasm32"))]
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("logger already installed");
    }
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
impl ConsoleLogger {
    fn accepts(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn format_record(record: &Record) -> String {
    format!("[{}] {}: {}", record.level(), record.target(), record.args())
}

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.accepts(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(record);
        match record.level() {
            Level::Error => web_sys::console::error_1(&line.into()),
            Level::Warn => web_sys::console::warn_1(&line.into()),
            _ => web_sys::console::log_1(&line.into()),
        }
    }

    fn flush(&self) {}
}
