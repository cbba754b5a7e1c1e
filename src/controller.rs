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

//! The control loop: poll temperatures, evaluate the curve, apply PWM.
//!
//! Strictly single-threaded. Cards are handled in discovery order, each one
//! fully (read, decide, apply) before the next, then the loop sleeps for the
//! configured interval. A shared shutdown flag is polled between sleep
//! slices so SIGINT/SIGTERM break the loop between ticks.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::json;

use crate::config::DaemonConfig;
use crate::curve::Curve;
use crate::error::Result;
use crate::logger;
use crate::scanner::Scanner;

/// Granularity of shutdown checks while sleeping between ticks.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct FanController {
    scanner: Scanner,
    curve: Curve,
    threshold: Option<f64>,
    frequency: Duration,
    /// Temperature at which a speed was last applied; 0 until the first
    /// apply, which disables the hysteresis band for the first tick.
    last_temp: f64,
}

impl FanController {
    /// Discover cards under `sysfs_root` and validate the configured curve.
    /// Both failure modes (no compatible cards, invalid curve) are fatal
    /// startup conditions for the caller.
    pub fn new(config: &DaemonConfig, sysfs_root: &Path) -> Result<FanController> {
        let curve = Curve::new(&config.speed_matrix)?;
        let scanner = Scanner::discover(sysfs_root, config.cards.as_deref())?;
        Ok(FanController {
            scanner,
            curve,
            threshold: config.threshold,
            frequency: Duration::from_secs(config.frequency),
            last_temp: 0.0,
        })
    }

    pub fn cards(&self) -> &Scanner {
        &self.scanner
    }

    /// One pass over all cards. Any error is propagated to the caller
    /// unchanged; running fans against stale data risks hardware damage,
    /// so there is no per-tick retry.
    pub fn tick(&mut self) -> Result<()> {
        for card in self.scanner.cards() {
            let temp = card.gpu_temp()?;
            let mut speed = self.curve.get_speed(temp.floor());
            if speed < 0.0 {
                // the driver rejects 1..=3 as duty values; 4 is the
                // lowest legal non-zero request
                speed = 4.0;
            }

            if let Some(threshold) = self.threshold {
                if self.last_temp != 0.0 {
                    let low = self.last_temp - threshold;
                    let high = self.last_temp + threshold;
                    if temp > low && temp < high {
                        logger::log_event(
                            "within_threshold",
                            json!({ "card": card.id(), "temp": temp, "last_temp": self.last_temp }),
                        );
                        continue;
                    }
                }
            }

            card.set_fan_speed(speed)?;
            self.last_temp = temp;
        }
        Ok(())
    }

    /// Run until the shutdown flag is raised. Ticks never overlap; the only
    /// suspension point is the sleep between them.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        logger::log_event(
            "loop_start",
            json!({
                "cards": self.scanner.cards().len(),
                "frequency_secs": self.frequency.as_secs(),
                "threshold": self.threshold,
            }),
        );

        while !shutdown.load(Ordering::SeqCst) {
            self.tick()?;

            let mut slept = Duration::ZERO;
            while slept < self.frequency {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let slice = SLEEP_SLICE.min(self.frequency - slept);
                thread::sleep(slice);
                slept += slice;
            }
        }

        logger::log_event("loop_stop", json!({}));
        Ok(())
    }

    #[cfg(test)]
    fn last_temp(&self) -> f64 {
        self.last_temp
    }
}
