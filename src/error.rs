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

//! Error types shared across card I/O, discovery, and the control loop.

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ControlError>;

#[derive(thiserror::Error, Debug)]
pub enum ControlError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid fan curve: {0}")]
    InvalidCurve(String),

    #[error("no compatible cards found")]
    NoCompatibleCards,

    #[error("card {card} has no '{endpoint}' endpoint")]
    EndpointMissing { card: String, endpoint: &'static str },

    #[error("permission denied accessing '{endpoint}' on {card} (are you running as root?)")]
    PermissionDenied { card: String, endpoint: &'static str },

    #[error("could not parse '{endpoint}' on {card}: {raw:?}")]
    Parse {
        card: String,
        endpoint: &'static str,
        raw: String,
    },

    #[error("invalid configuration in {}: {reason}", .path.display())]
    InvalidConfig { path: PathBuf, reason: String },
}

impl ControlError {
    /// True for errors caused by insufficient privileges rather than
    /// hardware state.
    pub fn is_permission(&self) -> bool {
        matches!(self, ControlError::PermissionDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ControlError::EndpointMissing {
            card: "card0".to_string(),
            endpoint: "pwm1_max",
        };
        assert_eq!(format!("{}", err), "card card0 has no 'pwm1_max' endpoint");

        let err = ControlError::NoCompatibleCards;
        assert_eq!(format!("{}", err), "no compatible cards found");

        // reads and writes share this variant, so the wording must not
        // claim a direction
        let err = ControlError::PermissionDenied {
            card: "card1".to_string(),
            endpoint: "pwm1",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("permission denied accessing 'pwm1'"));
        assert!(!msg.contains("writing"));
        assert!(err.is_permission());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: ControlError = io_err.into();
        assert!(matches!(err, ControlError::Io(_)));
        assert!(!err.is_permission());
    }
}
