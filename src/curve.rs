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

//! Piecewise-linear temperature-to-fan-speed mapping.
//!
//! Built once from the configured speed matrix and validated up front; a
//! malformed curve is a startup error, never a runtime surprise.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};

/// The amdgpu driver treats 1..=3 as invalid duty requests; 4 is the lowest
/// legal non-zero value, so curves must not dip below it.
pub const MIN_CURVE_SPEED: f64 = 4.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CurvePoint {
    pub temp: f64,
    pub speed: f64,
}

#[derive(Clone, Debug)]
pub struct Curve {
    points: Vec<CurvePoint>,
}

impl Curve {
    /// Build a curve from ordered `[temperature, speed_percent]` pairs.
    /// Rejects anything physically nonsensical: speeds outside 0..=100,
    /// temperatures that do not strictly increase, speeds that decrease,
    /// or a minimum speed at or below 3.
    pub fn new(speed_matrix: &[[f64; 2]]) -> Result<Curve> {
        if speed_matrix.len() < 2 {
            return Err(ControlError::InvalidCurve(
                "speed_matrix needs at least two points".to_string(),
            ));
        }

        let points: Vec<CurvePoint> = speed_matrix
            .iter()
            .map(|p| CurvePoint { temp: p[0], speed: p[1] })
            .collect();

        for p in &points {
            if p.temp.is_nan() || p.speed.is_nan() {
                return Err(ControlError::InvalidCurve("NaN in speed_matrix".to_string()));
            }
            if p.speed < 0.0 {
                return Err(ControlError::InvalidCurve(format!(
                    "fan speed {} is negative",
                    p.speed
                )));
            }
            if p.speed > 100.0 {
                return Err(ControlError::InvalidCurve(format!(
                    "fan speed {} is above 100%",
                    p.speed
                )));
            }
        }

        for w in points.windows(2) {
            if w[1].temp <= w[0].temp {
                return Err(ControlError::InvalidCurve(format!(
                    "temperatures must be strictly increasing ({} then {})",
                    w[0].temp, w[1].temp
                )));
            }
            if w[1].speed < w[0].speed {
                return Err(ControlError::InvalidCurve(format!(
                    "fan speeds must not decrease ({} then {})",
                    w[0].speed, w[1].speed
                )));
            }
        }

        // temps increase and speeds never decrease, so the first entry
        // holds the minimum speed
        if points[0].speed < MIN_CURVE_SPEED {
            return Err(ControlError::InvalidCurve(format!(
                "minimum fan speed {} is below the driver floor of {}",
                points[0].speed, MIN_CURVE_SPEED
            )));
        }

        Ok(Curve { points })
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Target fan speed percentage for a temperature. Clamped to the first
    /// and last points, linearly interpolated in between.
    pub fn get_speed(&self, temp: f64) -> f64 {
        let first = &self.points[0];
        let last = &self.points[self.points.len() - 1];
        if temp <= first.temp {
            return first.speed;
        }
        if temp >= last.temp {
            return last.speed;
        }
        for w in self.points.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            if temp >= a.temp && temp <= b.temp {
                let t = (temp - a.temp) / (b.temp - a.temp);
                return a.speed + t * (b.speed - a.speed);
            }
        }
        last.speed
    }
}
