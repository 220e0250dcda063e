use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/abi_conformance.json")
}

fn run_cli(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_abi-codegen"))
        .args(args)
        .current_dir(cwd)
        .env_remove("ABI_CODEGEN_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn validate_prints_summary_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = fixture_path();
    let output = run_cli(
        &["--input", fixture.to_str().unwrap(), "--validate"],
        dir.path(),
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("ABI manifest validated successfully"));
    assert!(out.contains("  Methods: 12"));
    assert!(out.contains("  Events: 6"));
    assert!(out.contains("  Types: 9"));
    assert!(!dir.path().join("src").exists());
}

#[test]
fn generate_writes_types_and_client() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = fixture_path();
    let out_dir = dir.path().join("generated");
    let output = run_cli(
        &[
            "-i",
            fixture.to_str().unwrap(),
            "-o",
            out_dir.to_str().unwrap(),
            "--client-name",
            "ConformanceClient",
        ],
        dir.path(),
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Code generation completed successfully"));
    assert!(out.contains("  Client: ConformanceClient"));
    assert!(out.contains("Generated files:"));

    let types = std::fs::read_to_string(out_dir.join("types.ts")).unwrap();
    let client = std::fs::read_to_string(out_dir.join("ConformanceClient.ts")).unwrap();
    assert!(types.contains("from './ConformanceClient.js';"));
    assert!(client.contains("export class ConformanceClient {"));
}

#[test]
fn client_name_derives_from_name_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = fixture_path();
    let output = run_cli(
        &[
            "-i",
            fixture.to_str().unwrap(),
            "--outDir",
            "out",
            "--name-from",
            "target/kv_store.wasm",
        ],
        dir.path(),
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("out/KVStoreClient.ts").is_file());
    assert!(dir.path().join("out/types.ts").is_file());
}

#[test]
fn client_name_falls_back_to_input_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(fixture_path(), dir.path().join("abi.json")).unwrap();

    let output = run_cli(&[], dir.path());

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("  Client: AbiClient"));
    assert!(dir.path().join("src/AbiClient.ts").is_file());
}

#[test]
fn missing_input_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(&["-i", "nope.json"], dir.path());

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: ABI file not found at nope.json"));
}

#[test]
fn invalid_manifest_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.json");
    std::fs::write(
        &input,
        r#"{"schema_version": "wasm-abi/1", "types": {}, "methods": [
            {"name": "x", "params": []}, {"name": "x", "params": []}
        ], "events": []}"#,
    )
    .unwrap();

    let output = run_cli(&["-i", input.to_str().unwrap(), "--validate"], dir.path());

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Validation failed: Duplicate method names: x"));
}

#[test]
fn generation_failure_is_prefixed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.json");
    std::fs::write(&input, r#"{"schema_version": "wasm-abi/9"}"#).unwrap();

    let output = run_cli(&["-i", input.to_str().unwrap()], dir.path());

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Code generation failed: Invalid schema version"));
    assert!(!dir.path().join("src").exists());
}
