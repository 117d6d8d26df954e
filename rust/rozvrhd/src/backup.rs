use crate::document::Document;
use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DOCUMENT_ENTRY: &str = "document.json";
pub const BUNDLE_FORMAT_V1: &str = "rozvrh-bundle-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub document_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub exported_at: Option<String>,
    pub document: Document,
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn export_document_bundle(
    document: &Document,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let document_text =
        serde_json::to_string_pretty(document).context("failed to serialize document")?;
    let checksum = sha256_hex(document_text.as_bytes());

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": crate::exchange::export_timestamp(),
        "documentSha256": checksum,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DOCUMENT_ENTRY, opts)
        .context("failed to start document entry")?;
    zip.write_all(document_text.as_bytes())
        .context("failed to write document entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 2,
        document_sha256: checksum,
    })
}

/// Reads and verifies a bundle. Nothing is written; the caller decides what to replace.
pub fn import_document_bundle(in_path: &Path) -> anyhow::Result<ImportSummary> {
    if !is_zip_file(in_path)? {
        return Err(anyhow!(
            "not a zip bundle: {}",
            in_path.to_string_lossy()
        ));
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }
    let expected = manifest
        .get("documentSha256")
        .and_then(|v| v.as_str())
        .context("manifest.json missing documentSha256")?
        .to_ascii_lowercase();

    let mut document_bytes = Vec::new();
    archive
        .by_name(DOCUMENT_ENTRY)
        .context("bundle missing document.json")?
        .read_to_end(&mut document_bytes)
        .context("failed to read document.json")?;
    let actual = sha256_hex(&document_bytes);
    if actual != expected {
        return Err(anyhow!(
            "document checksum mismatch: manifest {}, bundle {}",
            expected,
            actual
        ));
    }

    let document: Document =
        serde_json::from_slice(&document_bytes).context("document.json is not a document")?;

    Ok(ImportSummary {
        bundle_format_detected: format.to_string(),
        exported_at: manifest
            .get("exportedAt")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        document,
    })
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn bundle_round_trips_the_document() {
        let dir = temp_dir("rozvrh-backup-roundtrip");
        let bundle = dir.join("nested").join("backup.zip");
        let doc = crate::seed::default_document();

        let exported = export_document_bundle(&doc, &bundle).expect("export");
        assert_eq!(exported.bundle_format, BUNDLE_FORMAT_V1);
        assert_eq!(exported.document_sha256.len(), 64);

        let imported = import_document_bundle(&bundle).expect("import");
        assert_eq!(imported.bundle_format_detected, BUNDLE_FORMAT_V1);
        assert!(imported.exported_at.is_some());
        assert_eq!(imported.document, doc);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn tampered_document_fails_checksum() {
        let dir = temp_dir("rozvrh-backup-tampered");
        let bundle = dir.join("tampered.zip");
        let mut zip = ZipWriter::new(File::create(&bundle).expect("create"));
        let opts = FileOptions::default();
        zip.start_file(MANIFEST_ENTRY, opts).expect("manifest");
        zip.write_all(
            json!({ "format": BUNDLE_FORMAT_V1, "documentSha256": sha256_hex(b"{}") })
                .to_string()
                .as_bytes(),
        )
        .expect("write manifest");
        zip.start_file(DOCUMENT_ENTRY, opts).expect("document");
        zip.write_all(b"{\"classes\":[]}").expect("write document");
        zip.finish().expect("finish");

        let err = import_document_bundle(&bundle).expect_err("checksum");
        assert!(err.to_string().contains("checksum mismatch"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn plain_files_are_not_bundles() {
        let dir = temp_dir("rozvrh-backup-plain");
        let path = dir.join("data.json");
        std::fs::write(&path, "{}").expect("write");
        let err = import_document_bundle(&path).expect_err("not zip");
        assert!(err.to_string().contains("not a zip bundle"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
