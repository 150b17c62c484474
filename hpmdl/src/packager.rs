//! Artifact packaging: writes compiled output to a directory with a manifest.
//!
//! LAYOUT
//! ======
//! ```text
//! <dir>/ir.jsonl              meta line, then one line per IR module
//! <dir>/operators.json        operator catalog
//! <dir>/operators.cbor        operator catalog, CBOR encoded for the runtime
//! <dir>/numeric_specs.json    numeric operator specs
//! <dir>/job.json              job descriptor
//! <dir>/axiom_graph.graphml   axiom dependency graph
//! <dir>/manifest.json         sizes + SHA-256 of everything above
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::PackageError;
use crate::ir::IrModule;
use crate::pipeline::CompiledArtifacts;

pub const MANIFEST_FILE: &str = "manifest.json";
const IR_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub compiler_version: String,
    pub job_id: Uuid,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub artifacts: Vec<ArtifactEntry>,
    /// File name -> lowercase hex SHA-256.
    pub checksums: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub name: String,
    pub path: String,
    pub format: ArtifactFormat,
    pub size: u64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    JsonL,
    Json,
    Cbor,
    GraphMl,
}

#[derive(Serialize)]
struct IrMetaLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u32,
    entry_point: &'a str,
    modules: usize,
}

#[derive(Serialize)]
struct IrModuleLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    module: &'a IrModule,
}

#[derive(Debug, Default)]
pub struct ArtifactPackager;

impl ArtifactPackager {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Write every artifact plus `manifest.json` into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError`] if the directory or any file cannot be written.
    pub fn package(&self, dir: &Path, compiled: &CompiledArtifacts) -> Result<ArtifactManifest, PackageError> {
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

        let files: Vec<(&str, ArtifactFormat, &str, Vec<u8>)> = vec![
            ("ir.jsonl", ArtifactFormat::JsonL, "intermediate representation", self.ir_jsonl(compiled)?),
            ("operators.json", ArtifactFormat::Json, "operator catalog", serde_json::to_vec_pretty(&compiled.catalog)?),
            ("operators.cbor", ArtifactFormat::Cbor, "operator catalog (binary)", self.operators_cbor(compiled)?),
            (
                "numeric_specs.json",
                ArtifactFormat::Json,
                "numeric operator specs",
                serde_json::to_vec_pretty(&compiled.numeric_specs)?,
            ),
            ("job.json", ArtifactFormat::Json, "solver job descriptor", serde_json::to_vec_pretty(&compiled.job)?),
            (
                "axiom_graph.graphml",
                ArtifactFormat::GraphMl,
                "axiom dependency graph",
                compiled.axiom_graph.to_graphml().into_bytes(),
            ),
        ];

        let mut artifacts = Vec::with_capacity(files.len());
        let mut checksums = BTreeMap::new();
        for (name, format, description, bytes) in files {
            let path = dir.join(name);
            fs::write(&path, &bytes).map_err(|source| io_error(&path, source))?;
            checksums.insert(name.to_owned(), sha256_hex(&bytes));
            artifacts.push(ArtifactEntry {
                name: name.to_owned(),
                path: name.to_owned(),
                format,
                size: bytes.len() as u64,
                description: description.to_owned(),
            });
        }

        let manifest = ArtifactManifest {
            compiler_version: env!("CARGO_PKG_VERSION").to_owned(),
            job_id: compiled.job.job_id,
            created_at: now_ms(),
            artifacts,
            checksums,
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)
            .map_err(|source| io_error(&manifest_path, source))?;

        tracing::info!(dir = %dir.display(), artifacts = manifest.artifacts.len(), "packaged artifacts");
        Ok(manifest)
    }

    /// Encode the operator catalog as CBOR.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Cbor`] if encoding fails.
    pub fn operators_cbor(&self, compiled: &CompiledArtifacts) -> Result<Vec<u8>, PackageError> {
        let mut out = Vec::new();
        ciborium::into_writer(&compiled.catalog, &mut out).map_err(|e| PackageError::Cbor(e.to_string()))?;
        Ok(out)
    }

    /// Serialize the IR as JSON lines: one meta line, then one line per module.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Serialize`] if a module fails to serialize.
    pub fn ir_jsonl(&self, compiled: &CompiledArtifacts) -> Result<Vec<u8>, PackageError> {
        let ir = &compiled.ir;
        let mut out = serde_json::to_vec(&IrMetaLine {
            kind: "ir_meta",
            version: IR_FORMAT_VERSION,
            entry_point: &ir.entry_point,
            modules: ir.modules.len(),
        })?;
        out.push(b'\n');
        for module in &ir.modules {
            out.extend(serde_json::to_vec(&IrModuleLine { kind: "module", module })?);
            out.push(b'\n');
        }
        Ok(out)
    }
}

/// Check every file listed in `manifest` against its recorded checksum.
/// Returns the names of files that are missing or altered.
#[must_use]
pub fn verify_manifest(dir: &Path, manifest: &ArtifactManifest) -> Vec<String> {
    manifest
        .checksums
        .iter()
        .filter(|(name, expected)| fs::read(dir.join(name)).map_or(true, |bytes| sha256_hex(&bytes) != **expected))
        .map(|(name, _)| name.clone())
        .collect()
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

fn io_error(path: &Path, source: std::io::Error) -> PackageError {
    PackageError::Io { path: path.display().to_string(), source }
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "packager_test.rs"]
mod tests;
