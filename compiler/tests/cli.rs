// End-to-end tests: run the `kemit` binary on bundles and check output,
// diagnostics and exit codes.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};

// ── Test helpers ────────────────────────────────────────────────────────────

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn kemit_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_kemit"))
}

fn demo(name: &str) -> PathBuf {
    project_root().join("demos").join(name)
}

/// Unique counter for temp file names (avoids collisions in parallel tests).
static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn temp_path(prefix: &str, ext: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("{}_{}_{}.{}", prefix, std::process::id(), n, ext))
}

fn run(args: &[&str]) -> Output {
    Command::new(kemit_binary())
        .args(args)
        .output()
        .expect("failed to run kemit")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// ── Successful emission ─────────────────────────────────────────────────────

#[test]
fn emits_code_with_provenance_header() {
    let bundle = demo("saxpy_until.json");
    let out = run(&[bundle.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("/* kemit "), "{}", text);
    assert!(text.contains("__global__ void kernel0(float *X, float *Y, float a, int N)"));
    assert!(text.contains("label_for_c0: ;"));
}

#[test]
fn emits_declaration() {
    let bundle = demo("saxpy_until.json");
    let out = run(&[bundle.to_str().unwrap(), "--emit", "declaration"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "void __ppcg_saxpy_until_prog0(int N, int M, float *X, float *Y, float a);\n"
    );
}

#[test]
fn emits_invocation() {
    let bundle = demo("saxpy_until.json");
    let out = run(&[bundle.to_str().unwrap(), "--emit", "invocation"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "__ppcg_saxpy_until_prog0(N, M, (float*)&X[0], (float*)&Y[0], a);\n"
    );
}

#[test]
fn emits_types() {
    let bundle = demo("saxpy_until.json");
    let out = run(&[bundle.to_str().unwrap(), "--emit", "types"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "struct pair { float lo; float hi; };\n");
}

#[test]
fn build_info_is_json() {
    let bundle = demo("saxpy_until.json");
    let out = run(&[bundle.to_str().unwrap(), "--emit", "build-info"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["bundle_hash"].as_str().unwrap().len(), 64);
    assert_eq!(json["compiler_version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn flags_override_options_file() {
    let options = temp_path("kemit_opts", "json");
    std::fs::write(&options, r#"{ "indent": 8, "emit_provenance": false }"#).unwrap();
    let bundle = demo("saxpy_until.json");
    let out = run(&[
        bundle.to_str().unwrap(),
        "--options",
        options.to_str().unwrap(),
        "--indent",
        "4",
        "--memory-space",
        "__global",
    ]);
    let _ = std::fs::remove_file(&options);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("struct pair"), "{}", text);
    assert!(text.contains("\n    int b0 = blockIdx.x;\n"));
    assert!(text.contains("kernel0(__global float *X, __global float *Y, float a, int N)"));
}

#[test]
fn writes_output_file() {
    let output = temp_path("kemit_out", "cu");
    let bundle = demo("saxpy_until.json");
    let out = run(&[
        bundle.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--emit",
        "invocation",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).is_empty());
    let written = std::fs::read_to_string(&output).unwrap();
    let _ = std::fs::remove_file(&output);
    assert!(written.starts_with("__ppcg_saxpy_until_prog0("));
}

// ── Failures ────────────────────────────────────────────────────────────────

#[test]
fn missing_bundle_exits_with_2() {
    let missing = temp_path("kemit_missing", "json");
    let out = run(&[missing.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("kemit: error:"));
}

#[test]
fn invalid_bundle_exits_with_1() {
    let bundle = temp_path("kemit_invalid", "json");
    std::fs::write(&bundle, r#"{ "prog": { "id": 0 } }"#).unwrap();
    let out = run(&[bundle.to_str().unwrap()]);
    let _ = std::fs::remove_file(&bundle);

    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("error[E0100]"), "{}", stderr(&out));
}

#[test]
fn unsupported_layout_exits_with_1() {
    let bundle = temp_path("kemit_layout", "json");
    std::fs::write(
        &bundle,
        r#"{
            "prog": {
                "id": 0,
                "params": ["N"],
                "arrays": [ { "type": "float", "name": "A", "n_index": 2, "bound": ["N", "4"] } ]
            },
            "host": { "block": [] }
        }"#,
    )
    .unwrap();
    let out = run(&[bundle.to_str().unwrap(), "--emit", "declaration"]);
    let _ = std::fs::remove_file(&bundle);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("error[E0300]"), "{}", stderr(&out));
}
