use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_oxilzo").to_string()
}

const SAMPLE_HEX: &str = "1b 04 11 12 11 13 14 11 14 88 00 02 12 11 12 11 13 87 01 14 14 11 2c 30 00 11 00 00";

// literal "abcd" followed by an end marker.
const ABCD: &[u8] = &[0x09, 0x01, b'a', b'b', b'c', b'd', 0x11, 0x00, 0x00];

#[test]
fn cli_demo_prints_sample() {
    let out = Command::new(bin()).arg("demo").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("Uncompressed Message : "));
    let first = lines.next().unwrap();
    assert!(first.starts_with("\t11 12 11 13 14 11 14 14"));
    assert!(stdout.trim_end().ends_with("11 12"));
}

#[test]
fn cli_decode_file_roundtrip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("abcd.lzo");
    let output = dir.path().join("abcd.out");
    std::fs::write(&input, ABCD).unwrap();

    let st = Command::new(bin())
        .arg("decode")
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&output).unwrap(), b"abcd");
}

#[test]
fn cli_refuses_existing_output_without_force() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("abcd.lzo");
    let output = dir.path().join("existing.out");
    std::fs::write(&input, ABCD).unwrap();
    std::fs::write(&output, b"keep me").unwrap();

    let st = Command::new(bin())
        .arg("decode")
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(!st.success());
    assert_eq!(std::fs::read(&output).unwrap(), b"keep me");

    let st = Command::new(bin())
        .args(["--force", "decode"])
        .arg(&input)
        .arg(&output)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&output).unwrap(), b"abcd");
}

#[test]
fn cli_hex_input_and_hex_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.txt");
    std::fs::write(&input, SAMPLE_HEX).unwrap();

    let out = Command::new(bin())
        .args(["decode", "--hex-input", "--hex", "-c"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let bytes = oxilzo::hexdump::parse_hex(&stdout).unwrap();
    assert_eq!(bytes.len(), 39);
    assert_eq!(bytes, oxilzo::decode(oxilzo::cli::DEMO_STREAM).unwrap());
}

#[test]
fn cli_check_only_writes_nothing() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("abcd.lzo");
    std::fs::write(&input, ABCD).unwrap();

    let out = Command::new(bin())
        .args(["decode", "--check-only"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn cli_malformed_stream_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bad.lzo");
    let output = dir.path().join("bad.out");
    // Starts with an M2 copy instead of a literal run.
    std::fs::write(&input, [0x03, 0x40, 0x00, 0x00]).unwrap();

    let out = Command::new(bin())
        .arg("decode")
        .arg(&input)
        .arg(&output)
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("malformed stream"), "stderr: {stderr}");
    assert!(!output.exists());
}

#[test]
fn cli_output_limit_flag() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.txt");
    std::fs::write(&input, SAMPLE_HEX).unwrap();

    let out = Command::new(bin())
        .args(["decode", "--hex-input", "--check-only", "--max-output", "16"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(!out.status.success());
}

#[test]
fn cli_trace_lists_instructions() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.txt");
    std::fs::write(&input, SAMPLE_HEX).unwrap();

    let out = Command::new(bin())
        .args(["trace", "--hex-input"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("declared length: 27"));
    // header + six instructions
    assert_eq!(stdout.lines().count(), 8);
    assert!(stdout.contains("M2L"));
    assert!(stdout.lines().last().unwrap().contains("end"));
}

#[test]
fn cli_json_stats() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("abcd.lzo");
    std::fs::write(&input, ABCD).unwrap();

    let out = Command::new(bin())
        .args(["--json", "decode", "--check-only"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    let start = stderr.find('{').unwrap();
    let json: serde_json::Value = serde_json::from_str(&stderr[start..]).unwrap();
    assert_eq!(json["command"], "decode");
    assert_eq!(json["output_size"], 4);
    assert_eq!(json["end_marker"], true);
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("END_MARKER_DISTANCE=16384"));
}
