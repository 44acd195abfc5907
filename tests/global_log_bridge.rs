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

//! This case installs the process-wide registry and routes the `log` crate into it. Both are
//! one-shot per process, so it runs without the test harness.

use drishti::Config;
use drishti::Level;
use drishti::Registry;
use drishti::append::Memory;

fn main() {
    let memory = Memory::default();
    let registry = Registry::builder()
        .config(Config {
            level: Level::Debug,
            ..Config::default()
        })
        .console(memory.clone())
        .build();

    let installed = drishti::global::init(registry).unwrap();
    assert!(std::ptr::eq(installed, drishti::global::registry()));
    drishti::bridge::setup_log_crate();

    log::info!(target: "billing", "invoice {} sent", 1042);
    log::trace!(target: "billing", "retry budget left");
    log::warn!(target: "auth", user = "ada", attempts = 3; "too many attempts");
    log::error!("no target override");

    let lines = memory.take();
    assert_eq!(lines.len(), 4, "{lines:#?}");
    assert!(lines[0].ends_with("[INFO] [billing] invoice 1042 sent"));
    assert!(lines[1].ends_with("[DEBUG] [billing] retry budget left"));
    assert!(
        lines[2].ends_with(r#"[WARNING] [auth] too many attempts {"user":"ada","attempts":3}"#),
        "{}",
        lines[2]
    );
    assert!(lines[3].ends_with("[ERROR] [global_log_bridge] no target override"));

    // the global level gates the log crate as well
    drishti::global::registry().set_level(Level::Error);
    log::warn!("filtered");
    assert!(memory.lines().is_empty());

    // loggers from the global registry share its sinks
    drishti::global::get_logger("billing").critical("direct");
    assert_eq!(memory.take().len(), 1);

    let second = Registry::builder().console(Memory::default()).build();
    assert!(drishti::global::init(second).is_err());
}
