use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid TOML for sim mode; short motor pauses keep runs fast
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sensing]
samples = 3
sample_gap_ms = 1

[motor]
step_delay_us = 100
settle_ms = 0
release_ms = 0

[controller]
cycle_secs = 1
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn raincatch(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("raincatch").unwrap();
    cmd.arg("--config").arg(cfg).arg("--offline");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "volume:", "stdout")]
#[case(&["run", "--cycles", "1"], 0, "cycle 1:", "stdout")]
#[case(&["actuate", "--direction", "open"], 0, "155 steps", "stdout")]
#[case(&["actuate", "--direction", "close"], 0, "160 steps", "stdout")]
#[case(&["actuate"], 2, "required", "stderr")]
#[case(&["actuate", "--direction", "sideways"], 2, "invalid value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let mut cmd = raincatch(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn run_cycles_emit_json_lines() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = raincatch(&cfg)
        .arg("--json")
        .args(["run", "--cycles", "2", "--cycle-secs", "1"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    for v in &lines {
        assert!(v["timestamp"].is_string());
        assert!(v["volume_liters"].as_f64().unwrap() >= 0.0);
        assert!(v["actions"].is_array());
        assert_eq!(v["command"], "None");
    }
}

#[rstest]
fn self_check_json_has_all_sources() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = raincatch(&cfg)
        .args(["--json", "self-check"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(v["volume_liters"].is_number());
    assert_eq!(v["rain"]["remote"], false);
}

#[rstest]
fn missing_config_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let absent = dir.path().join("nope.toml");
    Command::cargo_bin("raincatch")
        .unwrap()
        .arg("--config")
        .arg(&absent)
        .args(["--offline", "self-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rain: local="));
}

#[rstest]
#[case("[sensing]\nsamples = 0\n", "sensing.samples must be >= 1")]
#[case("[telemetry]\nbase_url = \"https://example.org/\"\n", "must not end with '/'")]
#[case("[controller]\nutc_offset_hours = 20\n", "utc_offset_hours")]
#[case("[sensing\n", "Configuration is invalid")]
fn cli_reports_bad_config(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, toml).unwrap();

    raincatch(&cfg)
        .arg("self-check")
        .assert()
        .failure()
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn bad_config_json_error_shape() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[sensing]\nsamples = 0\n").unwrap();

    let out = raincatch(&cfg)
        .args(["--json", "self-check"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["reason"], "Error");
    assert!(v["message"].as_str().unwrap().contains("sensing.samples"));
}

#[rstest]
fn cli_reports_bad_calibration_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("calib.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "raw,value").unwrap();
    writeln!(f, "100,0.0").unwrap();
    writeln!(f, "200,1.0").unwrap();

    raincatch(&cfg)
        .arg("--calibration")
        .arg(&bad_csv)
        .arg("self-check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn calibration_csv_is_applied() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let csv = dir.path().join("calib.csv");
    fs::write(&csv, "distance_cm,liters\n0,7.0\n10,4.0\n20,1.0\n").unwrap();

    raincatch(&cfg)
        .arg("--calibration")
        .arg(&csv)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("volume:"));
}
