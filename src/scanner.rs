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

//! Discovery of usable cards under a sysfs root.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::card::Card;
use crate::error::{ControlError, Result};
use crate::logger;

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/drm";

#[derive(Debug, Clone)]
pub struct Scanner {
    cards: Vec<Card>,
}

impl Scanner {
    /// Enumerate `card<digits>` directories under `root` and keep every
    /// candidate whose hwmon endpoints probe cleanly. Candidates missing
    /// endpoints are skipped silently; that is how non-GPU render nodes and
    /// incompatible devices fall out. An optional allow-list restricts
    /// discovery to the named cards (case-insensitive).
    pub fn discover(root: &Path, allowed: Option<&[String]>) -> Result<Scanner> {
        let mut candidates: Vec<(u32, String, PathBuf)> = Vec::new();
        let entries = fs::read_dir(root)?;
        for ent in entries.flatten() {
            let path = ent.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(index) = card_index(name) else {
                continue;
            };
            if let Some(allowed) = allowed {
                if !allowed.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                    continue;
                }
            }
            candidates.push((index, name.to_string(), path));
        }

        // hwmon indices shuffle across boots; card indices do not
        candidates.sort_by_key(|(index, _, _)| *index);

        let mut cards = Vec::new();
        for (_, name, path) in candidates {
            match Card::probe(&name, &path) {
                Ok(card) => cards.push(card),
                Err(e) => {
                    logger::log_event(
                        "card_skipped",
                        json!({ "card": name, "reason": e.to_string() }),
                    );
                }
            }
        }

        if cards.is_empty() {
            return Err(ControlError::NoCompatibleCards);
        }

        logger::log_event(
            "discovered",
            json!({ "cards": cards.iter().map(|c| c.id()).collect::<Vec<_>>() }),
        );
        Ok(Scanner { cards })
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn find(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id().eq_ignore_ascii_case(id))
    }
}

/// Parse the numeric index out of a `card<digits>` name. Rejects render
/// nodes (`renderD128`) and connector entries (`card0-DP-1`).
fn card_index(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("card")?;
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
