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

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use amdfand::config::{load_config, system_config_path};
use amdfand::controller::FanController;
use amdfand::scanner::{Scanner, DEFAULT_SYSFS_ROOT};
use amdfand::{config, logger, monitor};

const USAGE: &str = "\
usage: amdfand <mode> [--logging]

modes:
  daemon               run the fan control loop (requires root)
  monitor              show per-card readings in a TUI
  set <card> <pct>     apply a one-off fan speed (requires root)
  print-default        print the built-in default configuration
";

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--logging") {
        logger::init_logging();
        logger::log_event("startup", serde_json::json!({ "args": args }));
    }

    let mode = args.get(1).map(|s| s.as_str());
    let result = match mode {
        Some("daemon") => {
            require_root("daemon");
            run_daemon()
        }
        Some("monitor") => monitor::run_monitor(Path::new(DEFAULT_SYSFS_ROOT)),
        Some("set") => {
            require_root("set");
            run_set(args.get(2), args.get(3))
        }
        Some("print-default") => {
            println!("{}", config::default_config_json());
            Ok(())
        }
        _ => {
            eprint!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if let Err(err) = result {
        eprintln!("amdfand: {err}");
        logger::log_event("fatal_error", serde_json::json!({ "error": err.to_string() }));
        std::process::exit(1);
    }
}

/// Fan control writes to /sys need root; bail out early with a clear
/// message instead of failing on the first PWM write.
fn require_root(mode: &str) {
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("Error: amdfand {mode} requires root privileges to control fans.");
        eprintln!(
            "Please run with: sudo {}",
            std::env::args().next().unwrap_or_else(|| "amdfand".to_string())
        );
        std::process::exit(1);
    }
}

fn run_daemon() -> anyhow::Result<()> {
    let config = load_config(&system_config_path())?;
    let mut controller = FanController::new(&config, Path::new(DEFAULT_SYSFS_ROOT))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    controller.run(&shutdown)?;

    // hand the fans back to the driver on a clean shutdown
    for card in controller.cards().cards() {
        if let Err(e) = card.set_system_controlled_fan(true) {
            eprintln!("amdfand: could not restore automatic control on {}: {}", card.id(), e);
        }
    }
    Ok(())
}

fn run_set(card_id: Option<&String>, percent: Option<&String>) -> anyhow::Result<()> {
    let (Some(card_id), Some(percent)) = (card_id, percent) else {
        anyhow::bail!("usage: amdfand set <card> <percent>");
    };
    let percent: f64 = percent
        .parse()
        .map_err(|_| anyhow::anyhow!("percent must be a number, got {percent:?}"))?;
    if !(0.0..=100.0).contains(&percent) {
        anyhow::bail!("percent must be between 0 and 100");
    }

    let scanner = Scanner::discover(Path::new(DEFAULT_SYSFS_ROOT), None)?;
    let Some(card) = scanner.find(card_id) else {
        anyhow::bail!("no compatible card named {card_id:?}");
    };

    let written = card.set_fan_speed(percent)?;
    println!("{}: set fan to {}% (pwm {})", card.id(), percent, written);
    Ok(())
}
