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

//! Size-rotated log files with age- and size-based retention.
//!
//! # Example
//!
//! ```no_run
//! use drishti::append::FileBuilder;
//! use drishti::append::file::RetentionMatch;
//!
//! let file = FileBuilder::new("logs/billing.log")
//!     .max_file_size(10 * 1024 * 1024)
//!     .max_log_files(3)
//!     .retention_days(30)
//!     .retention_match(RetentionMatch::Numeric)
//!     .max_disk_bytes(100 * 1024 * 1024)
//!     .build()
//!     .unwrap();
//! println!("swept {} files at startup", file.startup_sweep().deleted.len());
//! ```

pub use append::DEFAULT_MAX_FILE_SIZE;
pub use append::DEFAULT_MAX_LOG_FILES;
pub use append::DEFAULT_RETENTION_DAYS;
pub use append::File;
pub use append::FileBuilder;
pub use retention::DiskUsage;
pub use retention::RetentionMatch;
pub use retention::RetentionPolicy;
pub use retention::SweepReport;
pub use retention::disk_usage;
pub use retention::sweep;
pub use rolling::RollingFileWriter;
pub use rolling::RollingFileWriterBuilder;

mod append;
mod retention;
mod rolling;
