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

//! Side channel for failures that must not reach the caller of an emit.
//!
//! Logging must never be the reason an application operation fails. Every failure inside the
//! pipeline (a sink that cannot be built, a rename that fails mid-rotation, an aged file that
//! cannot be deleted) is handed to a [`Trap`] instead of being returned. Traps must not log through
//! the registry's own sinks, since those may be the thing that is broken.

use std::fmt;
use std::sync::Arc;

use crate::Error;

mod default;

pub use self::default::DefaultTrap;

/// A receiver of failures raised inside the logging pipeline.
pub trait Trap: fmt::Debug + Send + Sync + 'static {
    /// Handle an error. Implementations must not panic.
    fn trap(&self, err: &Error);
}

impl<T: Trap> From<T> for Box<dyn Trap> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

impl<T: Trap + ?Sized> Trap for Arc<T> {
    fn trap(&self, err: &Error) {
        (**self).trap(err)
    }
}
