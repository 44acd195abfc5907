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

//! Drishti is a structured, leveled logging facility for applications: one set of sinks per
//! process, shared by cheap per-source logger handles.
//!
//! # Overview
//!
//! A [`Registry`] owns a console sink and, optionally, a file sink that rotates by size into
//! numbered backups (`app.log.1`, `app.log.2`, ...) and sweeps files older than a retention period
//! when it starts. Loggers obtained with [`Registry::get_logger`] stamp every record with their
//! source label. Failures inside the pipeline never reach the caller of an emit; they are handed to
//! a [`Trap`], which by default prints them to standard error.
//!
//! # Examples
//!
//! Configuration from the environment (`BILLING_LOG_LEVEL`, `BILLING_LOG_FILE_PATH`, ...):
//!
//! ```no_run
//! use drishti::Metadata;
//! use drishti::Registry;
//!
//! let registry = Registry::from_env("billing");
//! let logger = registry.get_logger("Invoices");
//! logger.info_with("invoice sent", &Metadata::new().with("invoice_id", 1042));
//! ```
//!
//! Explicit setup:
//!
//! ```
//! use drishti::Config;
//! use drishti::Level;
//! use drishti::Registry;
//! use drishti::layout::FormatMode;
//!
//! let registry = Registry::builder()
//!     .config(Config {
//!         level: Level::Warning,
//!         format: FormatMode::Simple,
//!         ..Config::default()
//!     })
//!     .build();
//!
//! let logger = registry.get_logger("Cache");
//! logger.info("not written");
//! logger.warning("written");
//! registry.set_level(Level::Error);
//! logger.warning("not written anymore");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod append;
pub mod bridge;
mod clock;
pub mod config;
mod error;
pub mod global;
pub mod layout;
mod metadata;
pub mod record;
pub mod registry;
pub mod trap;

pub use self::append::Append;
pub use self::config::Config;
pub use self::config::FileConfig;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::layout::Layout;
pub use self::metadata::Metadata;
pub use self::record::Failure;
pub use self::record::Level;
pub use self::record::Record;
pub use self::record::RecordBuilder;
pub use self::registry::LogScope;
pub use self::registry::Logger;
pub use self::registry::Registry;
pub use self::registry::RegistryBuilder;
pub use self::trap::Trap;
