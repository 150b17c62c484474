use super::*;
use crate::pipeline::{CompilerOptions, compile};

const SOURCE: &str = r"
    operator H: hamiltonian { matrix(2, 2, dense) = [[0, 1], [1, 0]] }
    state psi: dense [2] hamiltonian = H
    axiom flip: H * psi
    axiom twice: flip * flip
";

fn compiled() -> CompiledArtifacts {
    compile(SOURCE, &CompilerOptions::default()).unwrap()
}

#[test]
fn package_writes_every_artifact_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let compiled = compiled();
    let manifest = ArtifactPackager::new().package(dir.path(), &compiled).unwrap();

    let names: Vec<&str> = manifest.artifacts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["ir.jsonl", "operators.json", "operators.cbor", "numeric_specs.json", "job.json", "axiom_graph.graphml"]);
    for entry in &manifest.artifacts {
        let meta = fs::metadata(dir.path().join(&entry.path)).unwrap();
        assert_eq!(meta.len(), entry.size, "{}", entry.name);
    }
    assert!(dir.path().join(MANIFEST_FILE).exists());
    assert_eq!(manifest.job_id, compiled.job.job_id);
    assert_eq!(manifest.compiler_version, env!("CARGO_PKG_VERSION"));
    assert!(manifest.created_at > 0);
}

#[test]
fn package_records_formats() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = ArtifactPackager::new().package(dir.path(), &compiled()).unwrap();
    let formats: Vec<ArtifactFormat> = manifest.artifacts.iter().map(|a| a.format).collect();
    assert_eq!(
        formats,
        vec![
            ArtifactFormat::JsonL,
            ArtifactFormat::Json,
            ArtifactFormat::Cbor,
            ArtifactFormat::Json,
            ArtifactFormat::Json,
            ArtifactFormat::GraphMl,
        ]
    );
}

#[test]
fn manifest_on_disk_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = ArtifactPackager::new().package(dir.path(), &compiled()).unwrap();
    let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
    let parsed: ArtifactManifest = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, manifest);
    assert!(raw.contains("\"format\": \"jsonl\""));
}

#[test]
fn checksums_are_sha256_hex() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = ArtifactPackager::new().package(dir.path(), &compiled()).unwrap();
    let bytes = fs::read(dir.path().join("job.json")).unwrap();
    let expected = sha256_hex(&bytes);
    assert_eq!(manifest.checksums["job.json"], expected);
    assert_eq!(expected.len(), 64);
    assert!(expected.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
}

#[test]
fn sha256_hex_known_vector() {
    assert_eq!(sha256_hex(b"abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
}

#[test]
fn ir_jsonl_has_meta_line_then_modules() {
    let compiled = compiled();
    let bytes = ArtifactPackager::new().ir_jsonl(&compiled).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

    assert_eq!(lines.len(), 1 + compiled.ir.modules.len());
    assert_eq!(lines[0]["type"], "ir_meta");
    assert_eq!(lines[0]["version"], 1);
    assert_eq!(lines[0]["entry_point"], "main");
    assert_eq!(lines[1]["type"], "module");
    assert_eq!(lines[1]["name"], "main");
    assert_eq!(lines[1]["functions"].as_array().unwrap().len(), 3);
}

#[test]
fn operators_cbor_decodes_to_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let compiled = compiled();
    let manifest = ArtifactPackager::new().package(dir.path(), &compiled).unwrap();

    let bytes = fs::read(dir.path().join("operators.cbor")).unwrap();
    assert_eq!(manifest.checksums["operators.cbor"], sha256_hex(&bytes));
    let decoded: crate::codegen::OperatorCatalog = ciborium::from_reader(bytes.as_slice()).unwrap();
    assert_eq!(decoded, compiled.catalog);

    let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
    assert!(raw.contains("\"format\": \"cbor\""));
}

#[test]
fn verify_manifest_detects_tampering_and_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = ArtifactPackager::new().package(dir.path(), &compiled()).unwrap();
    assert!(verify_manifest(dir.path(), &manifest).is_empty());

    fs::write(dir.path().join("job.json"), b"{}").unwrap();
    fs::remove_file(dir.path().join("axiom_graph.graphml")).unwrap();
    assert_eq!(verify_manifest(dir.path(), &manifest), vec!["axiom_graph.graphml", "job.json"]);
}

#[test]
fn package_creates_nested_directories() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("out").join("run-1");
    ArtifactPackager::new().package(&nested, &compiled()).unwrap();
    assert!(nested.join("ir.jsonl").exists());
}

#[test]
fn package_into_file_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"x").unwrap();
    let err = ArtifactPackager::new().package(&blocker, &compiled()).unwrap_err();
    assert!(matches!(err, PackageError::Io { .. }));
}
