use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::profile::ProfileRecord;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Export<'a> {
    exported_at: String,
    count: usize,
    profiles: &'a [ProfileRecord],
}

/// Pretty-printed JSON for a single record.
pub fn record_json(record: &ProfileRecord) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

pub fn write_record(path: &Path, record: &ProfileRecord) -> Result<()> {
    write_file(path, &record_json(record)?)
}

/// Write every record under an `{exportedAt, count, profiles}` envelope.
pub fn write_export(path: &Path, profiles: &[ProfileRecord]) -> Result<()> {
    let json = export_json(profiles, Utc::now())?;
    write_file(path, &json)
}

fn export_json(profiles: &[ProfileRecord], at: DateTime<Utc>) -> Result<String> {
    let export = Export {
        exported_at: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        count: profiles.len(),
        profiles,
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
