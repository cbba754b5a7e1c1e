/*
 * Integration tests for Amdfand
 *
 * These tests drive discovery, curve evaluation, and the control loop
 * together over a fake sysfs tree built in a temporary directory.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use amdfand::config::{load_config, write_config, DaemonConfig};
use amdfand::controller::FanController;
use amdfand::error::ControlError;
use amdfand::scanner::Scanner;
use tempfile::TempDir;

const FULL_ENDPOINTS: &[(&str, &str)] = &[
    ("temp1_input", "45000\n"),
    ("fan1_input", "1200\n"),
    ("pwm1", "0\n"),
    ("pwm1_max", "255\n"),
    ("pwm1_min", "0\n"),
    ("pwm1_enable", "2\n"),
];

fn make_card(root: &Path, id: &str, endpoints: &[(&str, &str)]) -> PathBuf {
    let hwmon = root.join(id).join("device").join("hwmon").join("hwmon0");
    fs::create_dir_all(&hwmon).unwrap();
    for (name, value) in endpoints {
        fs::write(hwmon.join(name), value).unwrap();
    }
    hwmon
}

fn set_temp(hwmon: &Path, celsius: f64) {
    fs::write(
        hwmon.join("temp1_input"),
        format!("{}\n", (celsius * 1000.0) as i64),
    )
    .unwrap();
}

fn read_pwm(hwmon: &Path) -> u32 {
    fs::read_to_string(hwmon.join("pwm1"))
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

#[test]
fn test_config_file_to_applied_speeds() {
    let tmp = TempDir::new().unwrap();
    let sysfs = tmp.path().join("sys");
    fs::create_dir_all(&sysfs).unwrap();
    let hwmon = make_card(&sysfs, "card0", FULL_ENDPOINTS);

    // write a config document the way `print-default` + editing would
    let config_path = tmp.path().join("etc").join("config.json");
    let cfg = DaemonConfig {
        cards: Some(vec!["CARD0".to_string()]),
        speed_matrix: vec![[4.0, 4.0], [30.0, 33.0], [80.0, 100.0]],
        threshold: None,
        frequency: 1,
    };
    write_config(&config_path, &cfg).unwrap();
    let loaded = load_config(&config_path).unwrap();

    let mut controller = FanController::new(&loaded, &sysfs).unwrap();

    let mut applied = Vec::new();
    for temp in [30.0, 30.0, 80.0] {
        set_temp(&hwmon, temp);
        controller.tick().unwrap();
        applied.push(read_pwm(&hwmon));
    }
    assert_eq!(applied, vec![84, 84, 255]);

    // control writes flipped the card to manual mode
    assert_eq!(
        fs::read_to_string(hwmon.join("pwm1_enable")).unwrap(),
        "1"
    );
}

#[test]
fn test_incompatible_card_is_excluded_from_control() {
    let tmp = TempDir::new().unwrap();
    let hwmon0 = make_card(tmp.path(), "card0", FULL_ENDPOINTS);
    // card1 has no pwm1_enable and must be skipped at discovery
    let incomplete: Vec<(&str, &str)> = FULL_ENDPOINTS
        .iter()
        .copied()
        .filter(|(name, _)| *name != "pwm1_enable")
        .collect();
    let hwmon1 = make_card(tmp.path(), "card1", &incomplete);

    let cfg = DaemonConfig {
        speed_matrix: vec![[4.0, 4.0], [80.0, 100.0]],
        ..DaemonConfig::default()
    };
    let mut controller = FanController::new(&cfg, tmp.path()).unwrap();
    set_temp(&hwmon0, 80.0);
    set_temp(&hwmon1, 80.0);
    controller.tick().unwrap();

    assert_eq!(read_pwm(&hwmon0), 255);
    // the skipped card was never written to
    assert_eq!(read_pwm(&hwmon1), 0);
}

#[test]
fn test_empty_discovery_surfaces_no_compatible_cards() {
    let tmp = TempDir::new().unwrap();
    // a drm tree with only render nodes and connectors
    fs::create_dir_all(tmp.path().join("renderD128")).unwrap();
    fs::create_dir_all(tmp.path().join("card0-DP-1")).unwrap();

    let err = Scanner::discover(tmp.path(), None).unwrap_err();
    assert!(matches!(err, ControlError::NoCompatibleCards));
}

#[test]
fn test_one_off_speed_write_via_scanner() {
    let tmp = TempDir::new().unwrap();
    let hwmon = make_card(tmp.path(), "card0", FULL_ENDPOINTS);

    let scanner = Scanner::discover(tmp.path(), None).unwrap();
    let card = scanner.find("card0").unwrap();
    let written = card.set_fan_speed(50.0).unwrap();

    assert_eq!(written, 128);
    assert_eq!(read_pwm(&hwmon), 128);
    assert_eq!(
        fs::read_to_string(hwmon.join("pwm1_enable")).unwrap(),
        "1"
    );
}

#[test]
fn test_run_loop_responds_to_shutdown_quickly() {
    let tmp = TempDir::new().unwrap();
    let hwmon = make_card(tmp.path(), "card0", FULL_ENDPOINTS);
    set_temp(&hwmon, 40.0);

    let cfg = DaemonConfig {
        speed_matrix: vec![[4.0, 4.0], [80.0, 100.0]],
        frequency: 60,
        ..DaemonConfig::default()
    };
    let mut controller = FanController::new(&cfg, tmp.path()).unwrap();

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    let handle = std::thread::spawn(move || controller.run(&flag));

    // the flag must interrupt the 60 second sleep between ticks
    std::thread::sleep(Duration::from_millis(200));
    let raised = Instant::now();
    shutdown.store(true, Ordering::SeqCst);
    handle.join().unwrap().unwrap();
    assert!(raised.elapsed() < Duration::from_secs(2));

    // one tick ran before the shutdown
    assert!(read_pwm(&hwmon) > 0);
}
