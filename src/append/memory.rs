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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::Layout;
use crate::append::Append;
use crate::layout::StructuredLayout;
use crate::record::Record;

/// An appender that keeps formatted lines in memory.
///
/// Clones share the same buffer, so a clone can be handed to a registry while the original is kept
/// to inspect what was written.
///
/// # Examples
///
/// ```
/// use drishti::Registry;
/// use drishti::append::Memory;
///
/// let memory = Memory::default();
/// let registry = Registry::builder().console(memory.clone()).build();
/// registry.get_logger("Billing").info("invoice sent");
///
/// assert_eq!(memory.lines().len(), 1);
/// assert!(memory.lines()[0].ends_with("[INFO] [Billing] invoice sent"));
/// ```
#[derive(Debug, Clone)]
pub struct Memory {
    layout: Arc<dyn Layout>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            layout: Arc::new(StructuredLayout::default()),
            lines: Arc::new(Mutex::new(vec![])),
        }
    }
}

impl Memory {
    /// Set the layout.
    ///
    /// Default to [`StructuredLayout`].
    pub fn with_layout(mut self, layout: impl Layout) -> Self {
        self.layout = Arc::new(layout);
        self
    }

    /// A copy of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.buffer().clone()
    }

    /// Remove and return every line written so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.buffer())
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Append for Memory {
    fn append(&self, record: &Record) -> Result<(), Error> {
        let mut buffer = self.buffer();
        let bytes = self.layout.format(record)?;
        buffer.push(String::from_utf8_lossy(&bytes).into_owned());
        Ok(())
    }
}
