/*
 * This file is part of Amdfand.
 *
 * Copyright (C) 2025 Amdfand contributors
 *
 * Amdfand is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Amdfand is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Amdfand. If not, see <https://www.gnu.org/licenses/>.
 */

//! Append-only JSON-lines event log. Events are dropped silently when the
//! logger was never initialized, so library code can log unconditionally.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serde_json::{json, Value};

const DEFAULT_LOG_PATH: &str = "/etc/amdfand/logs.json";
const FALLBACK_LOG_PATH: &str = "/tmp/amdfand_logs.json";

lazy_static! {
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn open_append(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Open the event log at the default system path, falling back to /tmp when
/// /etc is not writable (unprivileged monitor runs).
pub fn init_logging() {
    init_logging_to(Path::new(DEFAULT_LOG_PATH));
}

pub fn init_logging_to(path: &Path) {
    let file = open_append(path).or_else(|| open_append(Path::new(FALLBACK_LOG_PATH)));
    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = file;
    }
}

#[cfg(test)]
pub fn shutdown_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = None;
    }
}

pub fn log_event(event: &str, data: Value) {
    let line = json!({
        "ts_ms": now_millis(),
        "event": event,
        "data": data,
    })
    .to_string();

    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(f) = guard.as_mut() {
            let _ = writeln!(f, "{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_events_are_json_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs.json");
        init_logging_to(&path);

        log_event("startup", json!({ "mode": "daemon" }));
        log_event("pwm_write", json!({ "card": "card0", "written": 128 }));
        shutdown_logging();

        let data = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = data.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "startup");
        assert_eq!(first["data"]["mode"], "daemon");
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["data"]["written"], 128);
    }

    #[test]
    #[serial]
    fn test_uninitialized_logger_is_silent() {
        shutdown_logging();
        // must not panic or create files anywhere we can observe
        log_event("noop", json!({}));
    }
}
