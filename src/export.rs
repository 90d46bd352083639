use crate::collate::compare_names;
use crate::error::{GradebookError, Result};
use crate::model::AppState;
use crate::ops::homework_stats;
use anyhow::Context;
use chrono::NaiveDate;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
pub const WORKBOOK_FORMAT: &str = "classbook-workbook-v1";
pub const SHEET_COLUMNS: [&str; 7] = ["ID", "姓名", "分數", "未繳交次數", "待訂正次數", "表現", "備註"];

#[derive(Debug, Clone)]
pub struct WorkbookSummary {
    pub path: PathBuf,
    pub sheet_count: usize,
    pub row_count: usize,
}

pub fn backup_file_name(date: NaiveDate) -> String {
    format!("classroom_backup_{}.json", date.format("%Y-%m-%d"))
}

pub fn workbook_file_name(date: NaiveDate) -> String {
    format!("classroom_data_{}.zip", date.format("%Y-%m-%d"))
}

/// Writes the whole state as pretty JSON into `out_dir` and returns the path.
pub fn export_json(state: &AppState, out_dir: &Path, date: NaiveDate) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.to_string_lossy()))?;
    let path = out_dir.join(backup_file_name(date));
    let text = serde_json::to_string_pretty(state).context("failed to serialize state")?;
    std::fs::write(&path, text)
        .with_context(|| format!("failed to write backup {}", path.to_string_lossy()))?;
    Ok(path)
}

/// Parses a backup file. The document must be an object carrying both
/// `classes` and `students`; everything else falls back to field defaults.
pub fn import_json(path: &Path) -> Result<AppState> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        GradebookError::Decode(format!("cannot read {}: {}", path.to_string_lossy(), e))
    })?;
    parse_backup(&text)
}

pub fn parse_backup(text: &str) -> Result<AppState> {
    let value: Value = serde_json::from_str(text)?;
    let Some(obj) = value.as_object() else {
        return Err(GradebookError::Decode("backup is not a JSON object".into()));
    };
    for key in ["classes", "students"] {
        if !obj.contains_key(key) {
            return Err(GradebookError::Decode(format!("backup has no {} field", key)));
        }
    }
    let state: AppState = serde_json::from_value(value)?;
    Ok(state.normalize())
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn sheet_entry_name(index: usize, class_name: &str) -> String {
    let safe: String = class_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("sheets/{:02}-{}.csv", index + 1, safe)
}

fn class_sheet(state: &AppState, class_id: &str) -> (String, usize) {
    let mut out = SHEET_COLUMNS.join(",");
    out.push('\n');
    let students = state.class_students(class_id);
    for s in &students {
        let stats = homework_stats(state, &s.id);
        let row = [
            csv_quote(&s.id),
            csv_quote(&s.name),
            s.score.to_string(),
            stats.missing.to_string(),
            stats.correction.to_string(),
            csv_quote(&s.record_tag),
            csv_quote(&s.note),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    (out, students.len())
}

/// Writes one CSV sheet per class, classes ordered by name, plus a manifest
/// listing each sheet with its SHA-256.
pub fn export_workbook(state: &AppState, out_path: &Path) -> anyhow::Result<WorkbookSummary> {
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

    let mut classes: Vec<_> = state.classes.iter().collect();
    classes.sort_by(|a, b| compare_names(&a.name, &b.name));

    let mut sheets = Vec::new();
    let mut row_count = 0;
    for (i, class) in classes.iter().enumerate() {
        let entry = sheet_entry_name(i, &class.name);
        let (csv, rows) = class_sheet(state, &class.id);
        zip.start_file(entry.as_str(), opts)
            .with_context(|| format!("failed to start sheet {}", entry))?;
        zip.write_all(csv.as_bytes())
            .with_context(|| format!("failed to write sheet {}", entry))?;
        let mut hasher = Sha256::new();
        hasher.update(csv.as_bytes());
        sheets.push(json!({
            "entry": entry,
            "classId": class.id,
            "className": class.name,
            "rows": rows,
            "sha256": format!("{:x}", hasher.finalize()),
        }));
        row_count += rows;
    }

    let manifest = json!({
        "format": WORKBOOK_FORMAT,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "columns": SHEET_COLUMNS,
        "sheets": sheets,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;
    zip.finish().context("failed to finalize workbook")?;

    Ok(WorkbookSummary {
        path: out_path.to_path_buf(),
        sheet_count: classes.len(),
        row_count,
    })
}
