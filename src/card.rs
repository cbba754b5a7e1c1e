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

//! One GPU's hwmon monitoring/control surface.
//!
//! A `Card` is built once at discovery time with the small, fixed set of
//! endpoint files the amdgpu driver exposes. The endpoint set never changes
//! after construction; the values behind the files are read and written on
//! every poll.

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::error::{ControlError, Result};
use crate::logger;

pub const ENDPOINT_TEMP: &str = "temp1_input";
pub const ENDPOINT_FAN_INPUT: &str = "fan1_input";
pub const ENDPOINT_PWM: &str = "pwm1";
pub const ENDPOINT_PWM_MAX: &str = "pwm1_max";
pub const ENDPOINT_PWM_MIN: &str = "pwm1_min";
pub const ENDPOINT_PWM_ENABLE: &str = "pwm1_enable";

/// pwm1_enable values understood by the driver.
const PWM_MODE_MANUAL: &str = "1";
const PWM_MODE_AUTO: &str = "2";

#[derive(Debug, Clone)]
pub struct Card {
    id: String,
    temp_input: PathBuf,
    /// Absent on cards without a tachometer; reads report 0 RPM then.
    fan_input: Option<PathBuf>,
    pwm: PathBuf,
    pwm_max: PathBuf,
    pwm_min: PathBuf,
    pwm_enable: PathBuf,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl Card {
    /// Probe a `/sys/class/drm/cardN` directory and build a `Card` from the
    /// hwmon endpoints beneath it. Fails with `EndpointMissing` if any
    /// required endpoint is absent, which the scanner uses to drop
    /// incompatible candidates.
    pub fn probe(id: &str, card_dir: &Path) -> Result<Card> {
        let hwmon_dir = find_hwmon_dir(card_dir).ok_or(ControlError::EndpointMissing {
            card: id.to_string(),
            endpoint: "hwmon",
        })?;

        let require = |endpoint: &'static str| -> Result<PathBuf> {
            let p = hwmon_dir.join(endpoint);
            if p.is_file() {
                Ok(p)
            } else {
                Err(ControlError::EndpointMissing {
                    card: id.to_string(),
                    endpoint,
                })
            }
        };

        let fan_input = hwmon_dir.join(ENDPOINT_FAN_INPUT);
        Ok(Card {
            id: id.to_string(),
            temp_input: require(ENDPOINT_TEMP)?,
            fan_input: fan_input.is_file().then_some(fan_input),
            pwm: require(ENDPOINT_PWM)?,
            pwm_max: require(ENDPOINT_PWM_MAX)?,
            pwm_min: require(ENDPOINT_PWM_MIN)?,
            pwm_enable: require(ENDPOINT_PWM_ENABLE)?,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// GPU temperature in Celsius. The driver reports millidegrees.
    pub fn gpu_temp(&self) -> Result<f64> {
        let raw = self.read_endpoint(ENDPOINT_TEMP, &self.temp_input)?;
        let millideg: i64 = self.parse(ENDPOINT_TEMP, &raw)?;
        Ok(millideg as f64 / 1000.0)
    }

    /// Fan speed in RPM, or 0 when the card has no tachometer endpoint.
    pub fn fan_speed(&self) -> Result<u64> {
        let Some(path) = &self.fan_input else {
            return Ok(0);
        };
        let raw = self.read_endpoint(ENDPOINT_FAN_INPUT, path)?;
        self.parse(ENDPOINT_FAN_INPUT, &raw)
    }

    pub fn fan_max(&self) -> Result<u32> {
        let raw = self.read_endpoint(ENDPOINT_PWM_MAX, &self.pwm_max)?;
        self.parse(ENDPOINT_PWM_MAX, &raw)
    }

    pub fn fan_min(&self) -> Result<u32> {
        let raw = self.read_endpoint(ENDPOINT_PWM_MIN, &self.pwm_min)?;
        self.parse(ENDPOINT_PWM_MIN, &raw)
    }

    /// Current raw PWM duty value.
    pub fn pwm(&self) -> Result<u32> {
        let raw = self.read_endpoint(ENDPOINT_PWM, &self.pwm)?;
        self.parse(ENDPOINT_PWM, &raw)
    }

    /// Hand fan control to the driver (`2`, automatic) or take it over
    /// (`1`, manual). The driver ignores pwm1 writes while in automatic
    /// mode, so every manual write is preceded by a switch to manual.
    pub fn set_system_controlled_fan(&self, enabled: bool) -> Result<()> {
        let mode = if enabled { PWM_MODE_AUTO } else { PWM_MODE_MANUAL };
        self.write_endpoint(ENDPOINT_PWM_ENABLE, &self.pwm_enable, mode)
    }

    /// Apply a fan speed as a percentage of the card's PWM range. 100 and
    /// above write pwm1_max verbatim, 0 and below write pwm1_min verbatim.
    /// Returns the raw PWM value written.
    pub fn set_fan_speed(&self, percent: f64) -> Result<u32> {
        let value = if percent >= 100.0 {
            self.fan_max()?
        } else if percent <= 0.0 {
            self.fan_min()?
        } else {
            (self.fan_max()? as f64 * percent / 100.0).round() as u32
        };

        self.set_system_controlled_fan(false)?;
        self.write_endpoint(ENDPOINT_PWM, &self.pwm, &value.to_string())?;

        logger::log_event(
            "pwm_write",
            json!({
                "card": self.id,
                "percent": percent,
                "written": value,
            }),
        );
        Ok(value)
    }

    fn read_endpoint(&self, endpoint: &'static str, path: &Path) -> Result<String> {
        let mut s = String::new();
        fs::File::open(path)
            .and_then(|mut f| f.read_to_string(&mut s))
            .map_err(|e| self.map_io(endpoint, e))?;
        Ok(s.trim().to_string())
    }

    fn write_endpoint(&self, endpoint: &'static str, path: &Path, value: &str) -> Result<()> {
        fs::write(path, value).map_err(|e| self.map_io(endpoint, e))
    }

    fn map_io(&self, endpoint: &'static str, e: io::Error) -> ControlError {
        if e.kind() == io::ErrorKind::PermissionDenied {
            ControlError::PermissionDenied {
                card: self.id.clone(),
                endpoint,
            }
        } else {
            ControlError::Io(e)
        }
    }

    fn parse<T: std::str::FromStr>(&self, endpoint: &'static str, raw: &str) -> Result<T> {
        raw.parse().map_err(|_| ControlError::Parse {
            card: self.id.clone(),
            endpoint,
            raw: raw.to_string(),
        })
    }
}

/// Locate the hwmon directory for a card: `<card>/device/hwmon/hwmon*`.
/// The hwmon index is not stable across boots, so take the first entry.
fn find_hwmon_dir(card_dir: &Path) -> Option<PathBuf> {
    let hwmon_root = card_dir.join("device").join("hwmon");
    let entries = fs::read_dir(hwmon_root).ok()?;
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("hwmon"))
        })
        .collect();
    dirs.sort();
    dirs.into_iter().next()
}
