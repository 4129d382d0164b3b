use crate::render::{self, RenderInputs, TemplateKey};
use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const BUNDLE_FORMAT_V1: &str = "reportcard-bundle-v1";
const MANIFEST_ENTRY: &str = "manifest.json";

#[derive(Debug, Clone)]
pub struct ExportedReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub file_name: String,
    pub student_name: String,
    pub byte_count: usize,
    pub page_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct BundleSummary {
    pub bundle_path: PathBuf,
    pub entry_count: usize,
    pub entries: Vec<BundleEntry>,
}

pub fn slug(s: &str) -> String {
    let mut out = String::new();
    for part in s.split_whitespace() {
        let cleaned: String = part
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if cleaned.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('_');
        }
        out.push_str(&cleaned);
    }
    if out.is_empty() {
        "report".to_string()
    } else {
        out
    }
}

/// Deterministic download name: student, term and year with whitespace
/// collapsed to underscores.
pub fn suggested_file_name(student_name: &str, term_name: &str, year: &str) -> String {
    format!(
        "{}_{}_{}.pdf",
        slug(student_name),
        slug(term_name),
        slug(year)
    )
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Runs the selected template over the prepared inputs and names the result.
pub fn assemble(key: TemplateKey, inputs: &RenderInputs) -> anyhow::Result<ExportedReport> {
    let doc = render::render(key, inputs)?;
    Ok(ExportedReport {
        file_name: suggested_file_name(
            &inputs.student.full_name,
            &inputs.term.name,
            &inputs.term.year,
        ),
        bytes: doc.bytes,
        page_count: doc.page_count,
    })
}

pub fn write_report(out_dir: &Path, report: &ExportedReport) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.to_string_lossy()))?;
    let path = out_dir.join(&report.file_name);
    std::fs::write(&path, &report.bytes)
        .with_context(|| format!("failed to write report {}", path.to_string_lossy()))?;
    Ok(path)
}

/// Packs one report per student into a zip bundle with a manifest. The bundle
/// is written under a temporary name and renamed into place so a failed run
/// never leaves a partial archive behind.
pub fn export_class_bundle(
    out_dir: &Path,
    bundle_name: &str,
    generated_on: NaiveDate,
    reports: &[(String, ExportedReport)],
) -> anyhow::Result<BundleSummary> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.to_string_lossy()))?;
    let final_path = out_dir.join(bundle_name);
    let tmp_path = out_dir.join(format!("{}.writing", bundle_name));
    if tmp_path.exists() {
        let _ = std::fs::remove_file(&tmp_path);
    }

    let entries: Vec<BundleEntry> = reports
        .iter()
        .map(|(student_name, report)| BundleEntry {
            file_name: report.file_name.clone(),
            student_name: student_name.clone(),
            byte_count: report.bytes.len(),
            page_count: report.page_count,
            sha256: sha256_hex(&report.bytes),
        })
        .collect();

    let out_file = File::create(&tmp_path).with_context(|| {
        format!(
            "failed to create bundle file {}",
            tmp_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "generatedOn": generated_on.format("%Y-%m-%d").to_string(),
        "reports": entries,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (_, report) in reports {
        zip.start_file(format!("reports/{}", report.file_name), opts)
            .with_context(|| format!("failed to start bundle entry {}", report.file_name))?;
        zip.write_all(&report.bytes)
            .with_context(|| format!("failed to write bundle entry {}", report.file_name))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    if final_path.exists() {
        std::fs::remove_file(&final_path).with_context(|| {
            format!(
                "failed to replace existing bundle {}",
                final_path.to_string_lossy()
            )
        })?;
    }
    std::fs::rename(&tmp_path, &final_path)
        .map_err(|e| anyhow!("failed to move bundle into place: {}", e))?;

    Ok(BundleSummary {
        bundle_path: final_path,
        entry_count: reports.len(),
        entries,
    })
}
