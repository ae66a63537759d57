use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<fdgh endian="big" xbin_version="2" num_string_null_terminators="4">
  <worldmap value="2">
    <room>Level1</room>
    <room>Level1</room>
  </worldmap>
  <rooms>
    <room name="Level1">
      <link>Level2</link>
      <asset>chara/Kirby</asset>
    </room>
    <room name="Level2">
      <asset>bg/Sky</asset>
    </room>
  </rooms>
</fdgh>
"#;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_fdgh"))
        .args(args)
        .output()
        .expect("failed to run fdgh CLI")
}

/// A fresh directory so default output names never collide between tests.
fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}_{}_{}", std::process::id(), nanos));
    fs::create_dir_all(&dir).expect("temp dir should be created");
    dir
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn convert_round_trips_through_default_paths() {
    let dir = temp_dir("fdgh_cli_roundtrip");
    let xml_path = dir.join("level.xml");
    fs::write(&xml_path, SAMPLE_XML).unwrap();

    let output = run_cli(&["convert", &path_arg(&xml_path)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let dat_path = dir.join("level.dat");
    let binary = fs::read(&dat_path).expect("binary output should exist");
    assert_eq!(&binary[..4], b"XBIN");

    let back_path = dir.join("back.xml");
    let output = run_cli(&["convert", &path_arg(&dat_path), &path_arg(&back_path)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let xml = fs::read_to_string(&back_path).unwrap();
    assert!(xml.contains("<room name=\"Level1\">"));
    assert!(xml.contains("<asset>chara/Kirby</asset>"));

    // The regenerated XML converts to the same bytes.
    let again_path = dir.join("again.dat");
    let output = run_cli(&["convert", &path_arg(&back_path), &path_arg(&again_path)]);
    assert!(output.status.success());
    assert_eq!(fs::read(&again_path).unwrap(), binary);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn convert_sniffs_content_over_extension() {
    let dir = temp_dir("fdgh_cli_sniff");
    let odd_path = dir.join("rooms.bin");
    let (_, body) = SAMPLE_XML.split_once('\n').unwrap();
    fs::write(&odd_path, format!("\u{feff}\n  {body}")).unwrap();

    let out_path = dir.join("rooms.out");
    let output = run_cli(&["convert", &path_arg(&odd_path), &path_arg(&out_path)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(&fs::read(&out_path).unwrap()[..4], b"XBIN");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn convert_refuses_to_replace_default_output() {
    let dir = temp_dir("fdgh_cli_overwrite");
    let xml_path = dir.join("level.xml");
    let dat_path = dir.join("level.dat");
    fs::write(&xml_path, SAMPLE_XML).unwrap();
    fs::write(&dat_path, b"keep me").unwrap();

    let output = run_cli(&["convert", &path_arg(&xml_path)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
    assert_eq!(fs::read(&dat_path).unwrap(), b"keep me");

    let output = run_cli(&["convert", "--overwrite", &path_arg(&xml_path)]);
    assert!(output.status.success());
    assert_eq!(&fs::read(&dat_path).unwrap()[..4], b"XBIN");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn convert_reports_unknown_references() {
    let dir = temp_dir("fdgh_cli_unknown");
    let xml_path = dir.join("broken.xml");
    fs::write(
        &xml_path,
        "<fdgh><rooms><room name=\"A\"><link>B</link></room></rooms></fdgh>",
    )
    .unwrap();

    let output = run_cli(&["convert", &path_arg(&xml_path)]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("UnknownReference"), "{stderr}");
    assert!(!dir.join("broken.dat").exists());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn unpack_then_pack_restores_the_file() {
    let dir = temp_dir("fdgh_cli_unpack");
    let xml_path = dir.join("level.xml");
    fs::write(&xml_path, SAMPLE_XML).unwrap();
    assert!(run_cli(&["convert", &path_arg(&xml_path)]).status.success());
    let dat_path = dir.join("level.dat");

    let output = run_cli(&["unpack", &path_arg(&dat_path)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let config = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert_eq!(config, "2,big,0xfde9");

    let payload_path = dir.join("level.unpacked.bin");
    let payload = fs::read(&payload_path).unwrap();
    assert_eq!(&payload[..4], b"FDGH");

    let output = run_cli(&["pack", &path_arg(&payload_path), &config]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let packed = fs::read(dir.join("level.unpacked.packed.bin")).unwrap();
    assert_eq!(packed, fs::read(&dat_path).unwrap());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn pack_rejects_bad_configuration() {
    let dir = temp_dir("fdgh_cli_pack");
    let raw_path = dir.join("raw.bin");
    fs::write(&raw_path, [0u8; 8]).unwrap();

    let output = run_cli(&["pack", &path_arg(&raw_path), "3,big,0"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("UnsupportedVersion"));

    let output = run_cli(&["pack", &path_arg(&raw_path), "2,sideways,0"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("MalformedConfig"));
    assert!(!dir.join("raw.packed.bin").exists());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn inspect_json_includes_expected_fields() {
    let dir = temp_dir("fdgh_cli_inspect");
    let xml_path = dir.join("level.xml");
    fs::write(&xml_path, SAMPLE_XML).unwrap();
    assert!(run_cli(&["convert", &path_arg(&xml_path)]).status.success());

    let output = run_cli(&["inspect", "--json", &path_arg(&dir.join("level.dat"))]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");

    assert_eq!(json["endianness"], "big");
    assert_eq!(json["xbin_version"], 2);
    assert_eq!(json["num_string_null_terminators"], 4);
    assert_eq!(json["asset_name_hashes"], Value::Null);
    assert_eq!(json["room_count"], 2);
    assert_eq!(json["world_map_entries"], 2);
    assert_eq!(json["layout"]["sections"][0]["id"], "Header");

    let output = run_cli(&["inspect", &path_arg(&dir.join("level.dat"))]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("XBIN v2, big endian"), "{stdout}");
    assert!(stdout.contains("Assets:       2 distinct"), "{stdout}");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn inspect_rejects_non_fdgh_input() {
    let dir = temp_dir("fdgh_cli_inspect_bad");
    let path = dir.join("junk.dat");
    fs::write(&path, b"not an xbin file at all").unwrap();

    let output = run_cli(&["inspect", &path_arg(&path)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("InvalidMagic"));

    let _ = fs::remove_dir_all(dir);
}
