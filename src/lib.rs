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

//! Amdfand - fan curve daemon for AMD GPUs
//!
//! Drives GPU fans from a user-defined temperature/speed curve over the
//! amdgpu hwmon sysfs interface. The library exposes card discovery, curve
//! evaluation, and the control loop; the binary wires them to a CLI.

pub mod card;
pub mod config;
pub mod controller;
pub mod curve;
pub mod error;
pub mod logger;
pub mod monitor;
pub mod scanner;
