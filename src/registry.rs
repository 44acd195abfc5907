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

//! The logger registry: one set of sinks shared by per-source handles.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use crate::Error;
use crate::Failure;
use crate::Level;
use crate::Metadata;
use crate::append::Append;
use crate::append::Console;
use crate::append::File;
use crate::append::FileBuilder;
use crate::append::file::DiskUsage;
use crate::append::file::SweepReport;
use crate::config::Config;
use crate::layout::FormatMode;
use crate::layout::Layout;
use crate::layout::StructuredLayout;
use crate::record::Record;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// A builder for configuring a [`Registry`].
///
/// # Examples
///
/// ```
/// use drishti::Config;
/// use drishti::Level;
/// use drishti::Registry;
/// use drishti::append::Testing;
///
/// let registry = Registry::builder()
///     .config(Config {
///         level: Level::Debug,
///         ..Config::default()
///     })
///     .console(Testing::default())
///     .build();
/// registry.get_logger("Checkout").debug("cart loaded");
/// ```
#[must_use = "call `build` to construct the registry"]
#[derive(Debug)]
pub struct RegistryBuilder {
    config: Config,
    console: Option<Box<dyn Append>>,
    appends: Vec<Box<dyn Append>>,
    trap: Arc<dyn Trap>,
}

impl RegistryBuilder {
    /// Set the configuration.
    ///
    /// Default to [`Config::default`]: console only, at [`Level::Info`].
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replace the console sink built from the configuration.
    pub fn console(mut self, append: impl Into<Box<dyn Append>>) -> Self {
        self.console = Some(append.into());
        self
    }

    /// Add a sink after the console and file sinks.
    pub fn append(mut self, append: impl Into<Box<dyn Append>>) -> Self {
        self.appends.push(append.into());
        self
    }

    /// Set the trap receiving every failure of the registry and its sinks.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Trap) -> Self {
        self.trap = Arc::new(trap);
        self
    }

    /// Build the [`Registry`].
    ///
    /// A file sink that cannot be built is reported to the trap and left out; the registry then
    /// logs to the console alone.
    pub fn build(self) -> Registry {
        let RegistryBuilder {
            config,
            console,
            appends: extra,
            trap,
        } = self;

        let console = console.unwrap_or_else(|| {
            Console::new(config.console)
                .with_layout(console_layout(&config))
                .into()
        });

        let file = config.file.as_ref().and_then(|file| {
            FileBuilder::new(&file.path)
                .max_file_size(file.max_bytes)
                .max_log_files(file.max_files)
                .retention_days(file.retention_days)
                .max_disk_bytes(file.max_disk_bytes)
                .retention_match(file.retention_match)
                .shared_trap(Arc::clone(&trap))
                .build()
                .inspect_err(|err| trap.trap(err))
                .ok()
                .map(Arc::new)
        });

        let mut appends = Vec::with_capacity(extra.len() + 2);
        appends.push(console);
        if let Some(file) = &file {
            appends.push(Box::new(Arc::clone(file)) as Box<dyn Append>);
        }
        appends.extend(extra);

        let shared = Arc::new(Shared {
            appends,
            file,
            trap,
        });
        let root = Logger::new(None, config.level, Arc::clone(&shared));
        let registry = Registry {
            shared,
            root,
            loggers: Mutex::new(HashMap::new()),
            config,
        };

        if let Some(file) = registry.shared.file.as_deref()
            && !file.startup_sweep().deleted.is_empty()
        {
            let report = file.startup_sweep();
            let metadata = sweep_metadata(report, file.retention().days);
            let message = format!("Cleaned up {} old log file(s)", report.deleted.len());
            registry.root.info_with(&message, &metadata);
        }

        registry
    }
}

fn console_layout(config: &Config) -> Box<dyn Layout> {
    match config.format {
        FormatMode::Structured if config.color => StructuredLayout::default().with_color(true).into(),
        format => format.layout(),
    }
}

fn sweep_metadata(report: &SweepReport, retention_days: u64) -> Metadata {
    Metadata::new()
        .with("retention_days", retention_days)
        .with("candidates", report.candidates as u64)
        .with("bytes_freed", report.bytes_freed)
        .with("errors", report.errors as u64)
}

#[derive(Debug)]
struct Shared {
    appends: Vec<Box<dyn Append>>,
    file: Option<Arc<File>>,
    trap: Arc<dyn Trap>,
}

impl Shared {
    fn dispatch(&self, record: &Record) {
        for append in &self.appends {
            if let Err(err) = append.append(record) {
                self.trap.trap(&err);
            }
        }
    }

    fn flush(&self) {
        for append in &self.appends {
            if let Err(err) = append.flush() {
                self.trap.trap(&err);
            }
        }
    }
}

/// The owner of the sinks and of one [`Logger`] per source label.
///
/// Build one with [`Registry::builder`] or [`Registry::from_env`] at startup and hand it, or the
/// loggers obtained from it, to the rest of the application. [`global`](crate::global) keeps a
/// process-wide instance for code that cannot be handed one.
#[derive(Debug)]
pub struct Registry {
    shared: Arc<Shared>,
    root: Logger,
    loggers: Mutex<HashMap<String, Logger>>,
    config: Config,
}

impl Registry {
    /// Create a new [`RegistryBuilder`].
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            config: Config::default(),
            console: None,
            appends: vec![],
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Build a registry from the configuration of `app` in the process environment.
    ///
    /// See [`Config::from_env`].
    pub fn from_env(app: &str) -> Registry {
        Registry::builder().config(Config::from_env(app)).build()
    }

    fn loggers(&self) -> MutexGuard<'_, HashMap<String, Logger>> {
        self.loggers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The logger for `source`, created on first request.
    ///
    /// Every call with the same label returns a handle to the same logger. An empty label returns
    /// the root logger, which stamps no source.
    pub fn get_logger(&self, source: &str) -> Logger {
        if source.is_empty() {
            return self.root.clone();
        }

        let mut loggers = self.loggers();
        if let Some(logger) = loggers.get(source) {
            return logger.clone();
        }

        let logger = Logger::new(
            Some(source.to_string()),
            self.root.level(),
            Arc::clone(&self.shared),
        );
        loggers.insert(source.to_string(), logger.clone());
        logger
    }

    /// The root logger.
    pub fn root(&self) -> &Logger {
        &self.root
    }

    /// The current minimum level.
    pub fn level(&self) -> Level {
        self.root.level()
    }

    /// Set the minimum level of the root logger and of every logger created so far.
    pub fn set_level(&self, level: Level) {
        // hold the map so a concurrent `get_logger` cannot create a handle with the old level
        let loggers = self.loggers();
        self.root.set_level(level);
        for logger in loggers.values() {
            logger.set_level(level);
        }
    }

    /// Parse a level name and apply it with [`set_level`](Registry::set_level).
    ///
    /// Unknown names fall back to [`Level::Info`]. Return the level applied.
    pub fn set_level_str(&self, level: &str) -> Level {
        let level = Level::parse_or_default(level);
        self.set_level(level);
        level
    }

    /// A snapshot of the effective configuration, with the current minimum level.
    pub fn config(&self) -> Config {
        Config {
            level: self.level(),
            ..self.config.clone()
        }
    }

    /// The file sink, if the configuration enabled one and it could be built.
    pub fn file(&self) -> Option<&File> {
        self.shared.file.as_deref()
    }

    /// Flush every sink. Failures go to the trap.
    pub fn flush(&self) {
        self.shared.flush();
    }

    /// Re-run the retention sweep of the file sink.
    ///
    /// Return `None` if there is no file sink.
    pub fn sweep(&self) -> Option<SweepReport> {
        self.file().map(|file| file.sweep())
    }

    /// Measure the log files of the file sink.
    ///
    /// Return `None` if there is no file sink.
    pub fn disk_usage(&self) -> Option<Result<DiskUsage, Error>> {
        self.file().map(|file| file.disk_usage())
    }

    /// Enter a named scope, optionally at a different minimum level.
    ///
    /// The scope logs through the logger for `name` on entry and again when the guard is
    /// dropped. When `level` is given it is applied with [`set_level`](Registry::set_level) and
    /// the previous level is restored on drop, including during a panic.
    ///
    /// # Examples
    ///
    /// ```
    /// use drishti::Level;
    /// use drishti::Registry;
    /// use drishti::append::Memory;
    ///
    /// let memory = Memory::default();
    /// let registry = Registry::builder().console(memory.clone()).build();
    /// {
    ///     let scope = registry.scope("Import", Some(Level::Debug));
    ///     scope.debug("reading rows");
    /// }
    /// assert_eq!(registry.level(), Level::Info);
    /// assert_eq!(memory.lines().len(), 3);
    /// ```
    pub fn scope(&self, name: &str, level: Option<Level>) -> LogScope<'_> {
        let previous = level.map(|level| {
            let previous = self.level();
            self.set_level(level);
            previous
        });
        let logger = self.get_logger(name);
        logger.info(&format!("Entered context: {name}"));
        LogScope {
            registry: self,
            name: name.to_string(),
            previous,
            logger,
        }
    }
}

/// A guard returned by [`Registry::scope`].
///
/// Dereferences to the scope's [`Logger`].
#[derive(Debug)]
pub struct LogScope<'a> {
    registry: &'a Registry,
    name: String,
    previous: Option<Level>,
    logger: Logger,
}

impl Deref for LogScope<'_> {
    type Target = Logger;

    fn deref(&self) -> &Logger {
        &self.logger
    }
}

impl Drop for LogScope<'_> {
    fn drop(&mut self) {
        let name = &self.name;
        if std::thread::panicking() {
            self.logger.error(&format!("Context {name} exited with error"));
        } else {
            self.logger.info(&format!("Exited context: {name}"));
        }

        if let Some(previous) = self.previous {
            self.registry.set_level(previous);
        }
    }
}

#[derive(Debug)]
struct LoggerInner {
    source: Option<String>,
    level: AtomicU8,
    shared: Arc<Shared>,
}

/// A handle for emitting records stamped with one source label.
///
/// Handles are cheap to clone and share their registry's sinks.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("source", &self.inner.source)
            .field("level", &self.level())
            .finish_non_exhaustive()
    }
}

impl Logger {
    fn new(source: Option<String>, level: Level, shared: Arc<Shared>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                source,
                level: AtomicU8::new(level as u8),
                shared,
            }),
        }
    }

    /// The source label, `None` for the root logger.
    pub fn source(&self) -> Option<&str> {
        self.inner.source.as_deref()
    }

    /// The minimum level of this logger.
    pub fn level(&self) -> Level {
        Level::from_u8(self.inner.level.load(Ordering::Relaxed))
    }

    fn set_level(&self, level: Level) {
        self.inner.level.store(level as u8, Ordering::Relaxed);
    }

    /// Whether a record at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    pub(crate) fn emit(
        &self,
        level: Level,
        message: &str,
        metadata: Option<&Metadata>,
        failure: Option<&Failure>,
    ) {
        if !self.enabled(level) {
            return;
        }

        let record = Record::builder()
            .level(level)
            .source(self.source())
            .payload(message)
            .metadata(metadata)
            .failure(failure)
            .build();
        self.inner.shared.dispatch(&record);
    }

    /// Log a message at `level`.
    pub fn log(&self, level: Level, message: &str) {
        self.emit(level, message, None, None);
    }

    /// Log a message at `level` with metadata.
    pub fn log_with(&self, level: Level, message: &str, metadata: &Metadata) {
        self.emit(level, message, Some(metadata), None);
    }

    /// Log a message at [`Level::Debug`].
    pub fn debug(&self, message: &str) {
        self.emit(Level::Debug, message, None, None);
    }

    /// Log a message at [`Level::Info`].
    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message, None, None);
    }

    /// Log a message at [`Level::Warning`].
    pub fn warning(&self, message: &str) {
        self.emit(Level::Warning, message, None, None);
    }

    /// Log a message at [`Level::Error`].
    pub fn error(&self, message: &str) {
        self.emit(Level::Error, message, None, None);
    }

    /// Log a message at [`Level::Critical`].
    pub fn critical(&self, message: &str) {
        self.emit(Level::Critical, message, None, None);
    }

    /// Log a message with metadata at [`Level::Debug`].
    pub fn debug_with(&self, message: &str, metadata: &Metadata) {
        self.emit(Level::Debug, message, Some(metadata), None);
    }

    /// Log a message with metadata at [`Level::Info`].
    pub fn info_with(&self, message: &str, metadata: &Metadata) {
        self.emit(Level::Info, message, Some(metadata), None);
    }

    /// Log a message with metadata at [`Level::Warning`].
    pub fn warning_with(&self, message: &str, metadata: &Metadata) {
        self.emit(Level::Warning, message, Some(metadata), None);
    }

    /// Log a message with metadata at [`Level::Error`].
    pub fn error_with(&self, message: &str, metadata: &Metadata) {
        self.emit(Level::Error, message, Some(metadata), None);
    }

    /// Log a message with metadata at [`Level::Critical`].
    pub fn critical_with(&self, message: &str, metadata: &Metadata) {
        self.emit(Level::Critical, message, Some(metadata), None);
    }

    /// Log a message and a captured failure at [`Level::Error`].
    ///
    /// # Examples
    ///
    /// ```
    /// use drishti::Failure;
    /// use drishti::Metadata;
    /// use drishti::Registry;
    /// use drishti::append::Testing;
    ///
    /// let registry = Registry::builder().console(Testing::default()).build();
    /// let logger = registry.get_logger("Payments");
    ///
    /// let err = "12x".parse::<u32>().unwrap_err();
    /// let meta = Metadata::new().with("input", "12x");
    /// logger.error_with_failure("bad amount", &Failure::capture(&err), Some(&meta));
    /// ```
    pub fn error_with_failure(
        &self,
        message: &str,
        failure: &Failure,
        metadata: Option<&Metadata>,
    ) {
        self.emit(Level::Error, message, metadata, Some(failure));
    }

    /// Log a message and a captured failure at [`Level::Critical`].
    pub fn critical_with_failure(
        &self,
        message: &str,
        failure: &Failure,
        metadata: Option<&Metadata>,
    ) {
        self.emit(Level::Critical, message, metadata, Some(failure));
    }

    /// Run `f`, logging its entry and exit.
    ///
    /// An `Err` is logged at [`Level::Error`] with the captured failure and returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use drishti::Registry;
    /// use drishti::append::Memory;
    ///
    /// let memory = Memory::default();
    /// let registry = Registry::builder().console(memory.clone()).build();
    /// let logger = registry.get_logger("Parser");
    ///
    /// let parsed = logger.instrument("parse_port", || "8080".parse::<u16>());
    /// assert_eq!(parsed, Ok(8080));
    /// assert_eq!(memory.lines().len(), 2);
    /// ```
    pub fn instrument<T, E, F>(&self, name: &str, f: F) -> Result<T, E>
    where
        E: StdError,
        F: FnOnce() -> Result<T, E>,
    {
        self.instrument_with(name, f, |err| Failure::capture(err))
    }

    /// Like [`Logger::instrument`], for functions returning [`anyhow::Result`].
    ///
    /// The failure carries the outermost context as its message and the rest of the error chain
    /// as its trace.
    ///
    /// # Examples
    ///
    /// ```
    /// use anyhow::Context;
    /// use drishti::Registry;
    /// use drishti::append::Memory;
    ///
    /// let memory = Memory::default();
    /// let registry = Registry::builder().console(memory.clone()).build();
    /// let logger = registry.get_logger("Loader");
    ///
    /// let loaded = logger.instrument_anyhow("load_port", || {
    ///     "http".parse::<u16>().context("reading PORT")
    /// });
    /// assert!(loaded.is_err());
    /// assert!(memory.lines()[1].contains("Error: reading PORT"));
    /// ```
    pub fn instrument_anyhow<T, F>(&self, name: &str, f: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        self.instrument_with(name, f, |err| Failure::from(err))
    }

    fn instrument_with<T, E, F, C>(&self, name: &str, f: F, capture: C) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        C: FnOnce(&E) -> Failure,
    {
        self.info(&format!("Entering {name}"));
        let result = f();
        match &result {
            Ok(_) => {
                let metadata = Metadata::new().with("result", "success");
                self.info_with(&format!("Exiting {name}"), &metadata);
            }
            Err(err) => {
                let metadata = Metadata::new().with("function", name);
                let failure = capture(err);
                self.error_with_failure(&format!("Error in {name}"), &failure, Some(&metadata));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::panic;
    use std::panic::AssertUnwindSafe;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;
    use crate::append::Memory;
    use crate::config::FileConfig;

    #[derive(Debug, Default, Clone)]
    struct CollectingTrap {
        errors: Arc<Mutex<Vec<ErrorKind>>>,
    }

    impl Trap for CollectingTrap {
        fn trap(&self, err: &Error) {
            self.errors.lock().unwrap().push(err.kind());
        }
    }

    fn memory_registry(level: Level) -> (Registry, Memory) {
        let memory = Memory::default();
        let registry = Registry::builder()
            .config(Config {
                level,
                ..Config::default()
            })
            .console(memory.clone())
            .build();
        (registry, memory)
    }

    #[test]
    fn test_get_logger_is_cached() {
        let (registry, memory) = memory_registry(Level::Info);
        let a = registry.get_logger("Orders");
        let b = registry.get_logger("Orders");
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        assert_eq!(a.source(), Some("Orders"));

        let root = registry.get_logger("");
        assert!(Arc::ptr_eq(&root.inner, &registry.root().inner));
        assert_eq!(root.source(), None);

        a.info("one");
        assert_eq!(memory.take().len(), 1);
    }

    #[test]
    fn test_below_minimum_is_dropped() {
        let (registry, memory) = memory_registry(Level::Warning);
        let logger = registry.get_logger("Cache");
        logger.debug("d");
        logger.info("i");
        assert!(memory.lines().is_empty());

        logger.warning("w");
        logger.critical("c");
        let lines = memory.take();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[WARNING] [Cache] w"));
        assert!(lines[1].ends_with("[CRITICAL] [Cache] c"));
    }

    #[test]
    fn test_set_level_propagates_to_existing_handles() {
        let (registry, memory) = memory_registry(Level::Debug);
        let early = registry.get_logger("Early");

        registry.set_level(Level::Error);
        let late = registry.get_logger("Late");
        assert_eq!(late.level(), Level::Error);

        early.warning("hidden");
        registry.root().warning("hidden");
        assert!(memory.lines().is_empty());

        early.error("shown");
        late.error("shown");
        assert_eq!(memory.take().len(), 2);

        assert_eq!(registry.set_level_str("nonsense"), Level::Info);
        assert_eq!(early.level(), Level::Info);
        assert_eq!(registry.config().level, Level::Info);
    }

    #[test]
    fn test_metadata_and_failure_are_formatted() {
        let (registry, memory) = memory_registry(Level::Info);
        let logger = registry.get_logger("Checkout");

        let meta = Metadata::new().with("order_id", 42);
        logger.info_with("order placed", &meta);
        logger.error_with_failure(
            "charge failed",
            &Failure::new("GatewayError", "card declined"),
            None,
        );

        let lines = memory.take();
        assert!(lines[0].ends_with(r#"[INFO] [Checkout] order placed {"order_id":42}"#));
        assert!(lines[1].ends_with("[ERROR] [Checkout] charge failed\nGatewayError: card declined"));
    }

    #[test]
    fn test_dispatch_order_and_extra_sinks() {
        let console = Memory::default();
        let extra = Memory::default();
        let registry = Registry::builder()
            .console(console.clone())
            .append(extra.clone())
            .build();

        registry.get_logger("A").info("hello");
        assert_eq!(console.lines().len(), 1);
        assert_eq!(extra.lines().len(), 1);
        assert!(registry.file().is_none());
        assert!(registry.sweep().is_none());
    }

    #[test]
    fn test_file_sink_receives_structured_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("svc.log");
        let memory = Memory::default();
        let registry = Registry::builder()
            .config(Config {
                format: FormatMode::Simple,
                file: Some(FileConfig::new(&log_path)),
                ..Config::default()
            })
            .console(memory.clone())
            .build();

        registry.get_logger("Inventory").warning("low stock");
        registry.flush();

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.ends_with("[WARNING] [Inventory] low stock\n"), "{content}");
        assert_eq!(memory.lines().len(), 1);
        assert_eq!(registry.disk_usage().unwrap().unwrap().file_count, 1);
    }

    #[test]
    fn test_file_sink_failure_keeps_console() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let trap = CollectingTrap::default();
        let memory = Memory::default();
        let registry = Registry::builder()
            .config(Config {
                file: Some(FileConfig::new(blocker.join("app.log"))),
                ..Config::default()
            })
            .console(memory.clone())
            .trap(trap.clone())
            .build();

        assert!(registry.file().is_none());
        assert_eq!(trap.errors.lock().unwrap().as_slice(), &[ErrorKind::Init]);

        registry.get_logger("Api").info("still here");
        assert_eq!(memory.lines().len(), 1);
    }

    #[derive(Debug)]
    struct BrokenSink;

    impl Append for BrokenSink {
        fn append(&self, _: &Record) -> Result<(), Error> {
            Err(Error::new(ErrorKind::Write, "disk full"))
        }
    }

    #[test]
    fn test_sink_failure_is_trapped_and_others_continue() {
        let trap = CollectingTrap::default();
        let memory = Memory::default();
        let registry = Registry::builder()
            .console(BrokenSink)
            .append(memory.clone())
            .trap(trap.clone())
            .build();

        registry.get_logger("Api").info("survives");
        assert_eq!(memory.lines().len(), 1);
        assert_eq!(trap.errors.lock().unwrap().as_slice(), &[ErrorKind::Write]);
    }

    #[test]
    fn test_startup_sweep_summary_is_logged() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("svc.log");
        let aged = temp_dir.path().join("svc.log.3");
        fs::write(&aged, "old").unwrap();
        let mtime = std::time::SystemTime::now() - std::time::Duration::from_secs(30 * 86400);
        fs::File::options()
            .write(true)
            .open(&aged)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let memory = Memory::default();
        let registry = Registry::builder()
            .config(Config {
                file: Some(FileConfig::new(&log_path)),
                ..Config::default()
            })
            .console(memory.clone())
            .build();

        assert!(!aged.exists());
        let lines = memory.take();
        assert_eq!(lines.len(), 1);
        assert!(
            lines[0].ends_with(
                r#"[INFO] Cleaned up 1 old log file(s) {"retention_days":14,"candidates":1,"bytes_freed":3,"errors":0}"#
            ),
            "{}",
            lines[0]
        );
        drop(registry);
    }

    #[test]
    fn test_scope_restores_level() {
        let (registry, memory) = memory_registry(Level::Warning);
        {
            let scope = registry.scope("Batch", Some(Level::Debug));
            scope.debug("row 1");
            assert_eq!(registry.get_logger("Other").level(), Level::Debug);
        }
        assert_eq!(registry.level(), Level::Warning);
        assert_eq!(registry.get_logger("Batch").level(), Level::Warning);

        let lines = memory.take();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[INFO] [Batch] Entered context: Batch"));
        assert!(lines[1].ends_with("[DEBUG] [Batch] row 1"));
        assert!(lines[2].ends_with("[INFO] [Batch] Exited context: Batch"));
    }

    #[test]
    fn test_scope_reports_panic_and_restores_level() {
        let (registry, memory) = memory_registry(Level::Info);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _scope = registry.scope("Job", Some(Level::Critical));
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(registry.level(), Level::Info);

        let lines = memory.take();
        // the entry line is below the scope's own level
        assert_eq!(lines.len(), 0);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _scope = registry.scope("Job", None);
            panic!("boom");
        }));
        assert!(result.is_err());
        let lines = memory.take();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("[ERROR] [Job] Context Job exited with error"));
    }

    #[test]
    fn test_instrument_logs_failure() {
        let (registry, memory) = memory_registry(Level::Info);
        let logger = registry.get_logger("Parser");

        let result = logger.instrument("parse_port", || "http".parse::<u16>());
        assert!(result.is_err());

        let lines = memory.take();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] [Parser] Entering parse_port"));
        assert!(
            lines[1].contains(r#"[ERROR] [Parser] Error in parse_port {"function":"parse_port"}"#),
            "{}",
            lines[1]
        );
        assert!(lines[1].ends_with("\nParseIntError: invalid digit found in string"));
    }

    #[test]
    fn test_instrument_anyhow_logs_error_chain() {
        use anyhow::Context;

        let (registry, memory) = memory_registry(Level::Info);
        let logger = registry.get_logger("Loader");

        let result = logger.instrument_anyhow("load_port", || {
            let port = "http".parse::<u16>().context("reading PORT")?;
            Ok(port)
        });
        assert!(result.is_err());

        let lines = memory.take();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] [Loader] Entering load_port"));
        assert!(
            lines[1].contains(r#"[ERROR] [Loader] Error in load_port {"function":"load_port"}"#),
            "{}",
            lines[1]
        );
        assert!(
            lines[1].ends_with(
                "\nError: reading PORT\n    caused by: invalid digit found in string"
            ),
            "{}",
            lines[1]
        );

        let ok = logger.instrument_anyhow("load_port", || Ok::<_, anyhow::Error>(8080));
        assert_eq!(ok.unwrap(), 8080);
        let lines = memory.take();
        assert!(lines[1].ends_with(r#"Exiting load_port {"result":"success"}"#));
    }
}
