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

//! A process-wide [`Registry`] for code that cannot be handed one.

use std::sync::OnceLock;

use crate::Logger;
use crate::Registry;

/// App name used when the global registry is built lazily from the environment.
pub const DEFAULT_APP: &str = "app";

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Install `registry` as the process-wide instance.
///
/// # Errors
///
/// Return the registry back if a process-wide instance already exists, either installed by an
/// earlier call or built by [`registry`].
///
/// # Examples
///
/// ```
/// use drishti::Registry;
/// use drishti::append::Testing;
///
/// let registry = Registry::builder().console(Testing::default()).build();
/// if drishti::global::init(registry).is_err() {
///     eprintln!("registry already installed");
/// }
/// ```
pub fn init(registry: Registry) -> Result<&'static Registry, Registry> {
    REGISTRY.set(registry)?;
    Ok(self::registry())
}

/// The process-wide registry.
///
/// If none was installed with [`init`], one is built from the environment of app
/// [`DEFAULT_APP`] on first call; every later call returns the same instance.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| Registry::from_env(DEFAULT_APP))
}

/// Shorthand for `registry().get_logger(source)`.
pub fn get_logger(source: &str) -> Logger {
    registry().get_logger(source)
}
