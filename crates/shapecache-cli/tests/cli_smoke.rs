//! CLI Smoke Tests
//!
//! Run the `shapecache` binary end to end for both commands, plus the
//! failure cases (bad flags, missing font).

use std::process::{Command, Output};

fn shapecache(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shapecache"))
        .args(args)
        .env_remove("SHAPECACHE_DISABLE")
        .env_remove("SHAPECACHE_SIZE")
        .output()
        .expect("failed to run shapecache")
}

fn json(output: &Output) -> serde_json::Value {
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("invalid JSON output")
}

#[test]
fn test_shape_reports_hits_on_repeat() {
    let output = shapecache(&["shape", "fit the fit", "--repeat", "2", "--json"]);
    let report = json(&output);

    assert_eq!(report["segments"]["segments"], 6);
    assert_eq!(report["segments"]["hits"], 3);
    assert_eq!(report["glyphs"].as_array().map(Vec::len), Some(9));
    assert_eq!(report["glyphs"][0]["glyph"], 0xFB01);
}

#[test]
fn test_shape_without_cache() {
    let output = shapecache(&["shape", "fit fit", "--no-cache", "--json"]);
    let report = json(&output);
    assert_eq!(report["segments"]["uncached"], 1);
    assert_eq!(report["tables"][0]["live"], 0);
}

#[test]
fn test_shape_table_output() {
    let output = shapecache(&["shape", "ab cd"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Segments: 2"));
}

#[test]
fn test_classify_marks_cuts() {
    let output = shapecache(&["classify", "ab cd", "--force", "0", "--json"]);
    let rows = json(&output);

    assert_eq!(rows[0]["decision"], "forced");
    assert_eq!(rows[1]["cut"], false);
    assert_eq!(rows[2]["decision"], "break-char");
    assert_eq!(rows[2]["cut_class"], 3);
    assert_eq!(rows[4]["cut"], true);
}

#[test]
fn test_bad_flag_position_fails() {
    let output = shapecache(&["classify", "ab", "--suppress", "5"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("past the end"));
}

#[test]
fn test_missing_font_fails() {
    let output = shapecache(&["shape", "ab", "--font-file", "/nonexistent/font.ttf"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn test_zero_repeat_reports_config_error() {
    let output = shapecache(&["shape", "ab", "--repeat", "0"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Configuration error: --repeat must be at least 1"));
}

#[test]
fn test_classify_json_is_valid() {
    let output = shapecache(&["classify", "a b", "--json"]);
    let rows = json(&output);
    assert_eq!(rows.as_array().map(Vec::len), Some(3));
    assert_eq!(rows[1]["code_point"], "U+0020");
}
