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

//! Daemon configuration: which cards to drive, the speed matrix, hysteresis
//! threshold, and poll interval.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};

pub const DEFAULT_FREQUENCY_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Restrict discovery to these card identifiers (case-insensitive).
    /// Absent means every compatible card is driven.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<String>>,
    /// Ordered `[temperature_c, fan_percent]` control points.
    pub speed_matrix: Vec<[f64; 2]>,
    /// Symmetric dead-band in degrees around the last applied temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Poll interval in seconds.
    #[serde(default = "default_frequency")]
    pub frequency: u64,
}

fn default_frequency() -> u64 {
    DEFAULT_FREQUENCY_SECS
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            cards: None,
            speed_matrix: vec![
                [4.0, 4.0],
                [30.0, 33.0],
                [45.0, 50.0],
                [60.0, 66.0],
                [65.0, 69.0],
                [70.0, 75.0],
                [75.0, 89.0],
                [80.0, 100.0],
            ],
            threshold: None,
            frequency: DEFAULT_FREQUENCY_SECS,
        }
    }
}

pub fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/amdfand/config.json")
}

pub fn load_config(path: &Path) -> Result<DaemonConfig> {
    let data = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ControlError::InvalidConfig {
                path: path.to_path_buf(),
                reason: "file not found (run `amdfand print-default` to generate one)".to_string(),
            }
        } else {
            ControlError::Io(e)
        }
    })?;
    let cfg: DaemonConfig =
        serde_json::from_str(&data).map_err(|e| ControlError::InvalidConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if cfg.frequency == 0 {
        return Err(ControlError::InvalidConfig {
            path: path.to_path_buf(),
            reason: "frequency must be at least 1 second".to_string(),
        });
    }
    Ok(cfg)
}

/// Write a config document, creating the parent directory as needed.
/// Permissions are set to 0644 best-effort so the monitor mode can read it
/// without privileges.
pub fn write_config(path: &Path, cfg: &DaemonConfig) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(cfg).unwrap_or_else(|_| "{}".to_string());
    fs::write(path, json)?;
    let perms = fs::Permissions::from_mode(0o644);
    let _ = fs::set_permissions(path, perms);
    Ok(())
}

pub fn default_config_json() -> String {
    serde_json::to_string_pretty(&DaemonConfig::default()).unwrap_or_else(|_| "{}".to_string())
}
