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

//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;

use crate::Error;
use crate::ErrorKind;
use crate::Level;
use crate::append::ConsoleTarget;
use crate::append::file::DEFAULT_MAX_FILE_SIZE;
use crate::append::file::DEFAULT_MAX_LOG_FILES;
use crate::append::file::DEFAULT_RETENTION_DAYS;
use crate::append::file::RetentionMatch;
use crate::layout::FormatMode;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// Settings of the file sink.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FileConfig {
    /// The active log file.
    pub path: PathBuf,
    /// Size in bytes at which the active file rotates; zero never rotates.
    pub max_bytes: u64,
    /// Number of numbered backups kept.
    pub max_files: usize,
    /// Age in days past which log files are swept; zero never sweeps.
    pub retention_days: u64,
    /// Total size in bytes the log set may take on disk; zero is unbounded.
    pub max_disk_bytes: u64,
    /// Which files of the log directory the sweep considers.
    pub retention_match: RetentionMatch,
}

impl FileConfig {
    /// File settings for `path` with every other field at its default.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_LOG_FILES,
            retention_days: DEFAULT_RETENTION_DAYS,
            max_disk_bytes: 0,
            retention_match: RetentionMatch::default(),
        }
    }
}

/// The effective configuration of a [`Registry`](crate::Registry).
///
/// The default is console-only at [`Level::Info`]. [`Config::from_env`] additionally enables the
/// file sink at `./logs/<app>.log` unless told otherwise.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Config {
    /// Minimum level of the root logger.
    pub level: Level,
    /// Console formatting. The file sink is always structured.
    pub format: FormatMode,
    /// The console stream.
    pub console: ConsoleTarget,
    /// Color console level names. Only honoured with the `colored` feature.
    pub color: bool,
    /// The file sink, if enabled.
    pub file: Option<FileConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: FormatMode::default(),
            console: ConsoleTarget::default(),
            color: false,
            file: None,
        }
    }
}

impl Config {
    /// Load the configuration of `app` from the process environment.
    ///
    /// Variables are prefixed with the upper-cased app name, e.g. `BILLING_LOG_LEVEL` for app
    /// `billing`. Malformed values fall back to their defaults and are reported on standard error.
    pub fn from_env(app: &str) -> Config {
        Config::from_lookup(app, |key| std::env::var(key).ok())
    }

    /// Load the configuration of `app` through `lookup` instead of the process environment.
    ///
    /// # Examples
    ///
    /// ```
    /// use drishti::Config;
    /// use drishti::Level;
    ///
    /// let config = Config::from_lookup("billing", |key| match key {
    ///     "BILLING_LOG_LEVEL" => Some("debug".to_string()),
    ///     "BILLING_LOG_FILE_PATH" => Some(String::new()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.level, Level::Debug);
    /// assert!(config.file.is_none());
    /// ```
    pub fn from_lookup(app: &str, lookup: impl Fn(&str) -> Option<String>) -> Config {
        Config::from_lookup_with_trap(app, lookup, &DefaultTrap::default())
    }

    /// Same as [`Config::from_lookup`], reporting malformed values to `trap`.
    pub fn from_lookup_with_trap(
        app: &str,
        lookup: impl Fn(&str) -> Option<String>,
        trap: &dyn Trap,
    ) -> Config {
        let vars = Vars {
            prefix: env_prefix(app),
            lookup: &lookup,
            trap,
        };

        let level = vars.parse("LOG_LEVEL", Level::Info, |s| {
            Level::from_str(s).map_err(|err| Error::new(ErrorKind::Config, err.to_string()))
        });
        let format = vars.parse("LOG_FORMAT", FormatMode::default(), FormatMode::from_str);
        let console = vars.parse("LOG_CONSOLE", ConsoleTarget::default(), ConsoleTarget::from_str);
        let color = vars.parse("LOG_COLOR", false, parse_bool);

        let file = match vars.get("LOG_FILE_PATH") {
            Some(path) if path.trim().is_empty() => None,
            path => {
                let path = path.map_or_else(|| default_log_path(app), PathBuf::from);
                Some(FileConfig {
                    path,
                    max_bytes: vars.parse("LOG_ROTATE_MAX_BYTES", DEFAULT_MAX_FILE_SIZE, parse_num),
                    max_files: vars.parse("LOG_ROTATE_MAX_FILES", DEFAULT_MAX_LOG_FILES, parse_num),
                    retention_days: vars.parse(
                        "LOG_RETENTION_DAYS",
                        DEFAULT_RETENTION_DAYS,
                        parse_num,
                    ),
                    max_disk_bytes: vars.parse("LOG_MAX_DISK_BYTES", 0, parse_num),
                    retention_match: vars.parse(
                        "LOG_RETENTION_MATCH",
                        RetentionMatch::default(),
                        RetentionMatch::from_str,
                    ),
                })
            }
        };

        Config {
            level,
            format,
            console,
            color,
            file,
        }
    }
}

/// The variable prefix for `app`: upper-cased, with every non-alphanumeric character as `_`.
///
/// ```
/// assert_eq!(drishti::config::env_prefix("order-service"), "ORDER_SERVICE");
/// ```
pub fn env_prefix(app: &str) -> String {
    app.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn default_log_path(app: &str) -> PathBuf {
    PathBuf::from(".").join("logs").join(format!("{app}.log"))
}

struct Vars<'a> {
    prefix: String,
    lookup: &'a dyn Fn(&str) -> Option<String>,
    trap: &'a dyn Trap,
}

impl Vars<'_> {
    fn key(&self, name: &str) -> String {
        format!("{}_{name}", self.prefix)
    }

    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&self.key(name))
    }

    // Unset and blank values take the default silently; malformed ones are trapped.
    fn parse<T>(&self, name: &str, default: T, parse: impl Fn(&str) -> Result<T, Error>) -> T {
        let Some(value) = self.get(name) else {
            return default;
        };
        if value.trim().is_empty() {
            return default;
        }
        match parse(value.trim()) {
            Ok(v) => v,
            Err(err) => {
                let err = err
                    .with_context("variable", self.key(name))
                    .with_context("value", &value);
                self.trap.trap(&err);
                default
            }
        }
    }
}

fn parse_num<T: FromStr<Err = std::num::ParseIntError>>(s: &str) -> Result<T, Error> {
    s.parse::<T>().map_err(|err| {
        Error::new(ErrorKind::Config, "malformed number").with_source(err)
    })
}

fn parse_bool(s: &str) -> Result<bool, Error> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::new(ErrorKind::Config, format!("malformed bool: {s:?}"))),
    }
}
