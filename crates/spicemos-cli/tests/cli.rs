//! Runs the built binary against card files.

use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;

const NMOS: &str = r#"{
    "model": { "name": "nch", "type": "nmos", "level": 1, "vto": 0.7, "kp": 2e-5, "tox": 2e-8 },
    "instance": { "w": 10e-6, "l": 10e-6 }
}"#;

fn card(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

fn spicemos(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_spicemos"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_op_json() {
    let file = card(NMOS);
    let out = spicemos(&["op", file.path().to_str().unwrap(), "--format", "json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let id = v["id"].as_f64().unwrap();
    assert!((id - 1e-5 * 1.69).abs() < 1e-9, "{id}");
    assert_eq!(v["mode"].as_f64(), Some(1.0));
}

#[test]
fn test_sweep_csv() {
    let file = card(NMOS);
    let out = spicemos(&[
        "sweep",
        file.path().to_str().unwrap(),
        "--start",
        "0",
        "--stop",
        "3",
        "--step",
        "0.5",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "vg,id,gm,gds,gmbs,von,vdsat");
    assert_eq!(lines.len(), 8);
    let ids: Vec<f64> = lines[1..]
        .iter()
        .map(|l| l.split(',').nth(1).unwrap().parse().unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_ac_table() {
    let file = card(NMOS);
    let out = spicemos(&[
        "ac",
        file.path().to_str().unwrap(),
        "--fstart",
        "1e3",
        "--fstop",
        "1e9",
        "--points",
        "7",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = String::from_utf8(out.stdout).unwrap();
    assert_eq!(text.lines().count(), 8);
}

#[test]
fn test_bad_card_fails() {
    let file = card(r#"{ "model": { "level": 5 } }"#);
    let out = spicemos(&["op", file.path().to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("level"));
}

#[test]
fn test_params_lists_names() {
    let out = spicemos(&["params"]);
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("vto") && text.contains("gmbs"));
}
