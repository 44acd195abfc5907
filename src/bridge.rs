// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A bridge to forward logs from the `log` crate to the global [`Registry`].

use std::borrow::Cow;

use crate::Level;
use crate::Metadata;
use crate::Registry;
use crate::global;

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warning,
            log::Level::Info => Self::Info,
            log::Level::Debug | log::Level::Trace => Self::Debug,
        }
    }
}

fn to_json(value: &log::kv::Value) -> serde_json::Value {
    if let Some(v) = value.to_bool() {
        return v.into();
    }
    if let Some(v) = value.to_i64() {
        return v.into();
    }
    if let Some(v) = value.to_u64() {
        return v.into();
    }
    if let Some(v) = value.to_f64() {
        return v.into();
    }
    if let Some(v) = value.to_borrowed_str() {
        return v.into();
    }
    value.to_string().into()
}

struct KeyValueVisitor<'a> {
    metadata: &'a mut Metadata,
}

impl<'kvs> log::kv::VisitSource<'kvs> for KeyValueVisitor<'_> {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        self.metadata.insert(key.as_str(), to_json(&value));
        Ok(())
    }
}

impl log::Log for Registry {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Level::from(metadata.level()) >= self.level()
    }

    fn log(&self, record: &log::Record) {
        let level = Level::from(record.level());
        let logger = self.get_logger(record.target());
        if !logger.enabled(level) {
            return;
        }

        let mut metadata = Metadata::new();
        let mut visitor = KeyValueVisitor {
            metadata: &mut metadata,
        };
        // the visitor itself never fails
        let _ = record.key_values().visit(&mut visitor);

        let payload = match record.args().as_str() {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(record.args().to_string()),
        };
        let metadata = (!metadata.is_empty()).then_some(&metadata);
        logger.emit(level, &payload, metadata, None);
    }

    fn flush(&self) {
        Registry::flush(self);
    }
}

struct LogCrateLogger(());

impl log::Log for LogCrateLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        log::Log::enabled(global::registry(), metadata)
    }

    fn log(&self, record: &log::Record) {
        log::Log::log(global::registry(), record)
    }

    fn flush(&self) {
        log::Log::flush(global::registry())
    }
}

/// Set up the log crate global logger.
///
/// This function calls [`log::set_logger`] to set up a proxy and all logs from log crate will be
/// forwarded to the [global registry](global::registry). The log target becomes the source label,
/// key-values become metadata and `Trace` records are logged at [`Level::Debug`].
///
/// This function will set the global maximum log level to `Trace`. The registry's own level
/// decides what is written.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// if let Err(err) = drishti::bridge::try_setup_log_crate() {
///     eprintln!("failed to setup log crate: {err}");
/// }
/// ```
pub fn try_setup_log_crate() -> Result<(), log::SetLoggerError> {
    static LOGGER: LogCrateLogger = LogCrateLogger(());
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Set up the log crate global logger.
///
/// See [`try_setup_log_crate`].
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
pub fn setup_log_crate() {
    try_setup_log_crate().expect(
        "drishti::bridge::setup_log_crate must be called before the log crate global logger initialized",
    )
}

#[cfg(test)]
mod tests {
    use log::Log;

    use super::*;
    use crate::Config;
    use crate::append::Memory;

    #[test]
    fn test_log_record_is_bridged() {
        let memory = Memory::default();
        let registry = Registry::builder()
            .config(Config {
                level: Level::Debug,
                ..Config::default()
            })
            .console(memory.clone())
            .build();

        let user = "ada";
        registry.log(
            &log::Record::builder()
                .level(log::Level::Trace)
                .target("auth::session")
                .args(format_args!("login by {user}"))
                .key_values(&[("attempt", 2), ("ttl", 30)])
                .build(),
        );
        registry.log(
            &log::Record::builder()
                .level(log::Level::Warn)
                .target("")
                .args(format_args!("plain"))
                .build(),
        );

        let lines = memory.take();
        assert_eq!(lines.len(), 2);
        assert!(
            lines[0].ends_with(r#"[DEBUG] [auth::session] login by ada {"attempt":2,"ttl":30}"#),
            "{}",
            lines[0]
        );
        assert!(lines[1].ends_with("[WARNING] plain"), "{}", lines[1]);
    }

    #[test]
    fn test_enabled_follows_registry_level() {
        let registry = Registry::builder().console(Memory::default()).build();
        let metadata = |level| log::Metadata::builder().level(level).build();
        assert!(!registry.enabled(&metadata(log::Level::Debug)));
        assert!(registry.enabled(&metadata(log::Level::Info)));
        registry.set_level(Level::Error);
        assert!(!registry.enabled(&metadata(log::Level::Warn)));
        assert!(registry.enabled(&metadata(log::Level::Error)));
    }
}
