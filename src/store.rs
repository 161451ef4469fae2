use crate::types::{Report, StoreError};
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Alias refreshed on every put so dashboards can grab the newest report
/// without listing. Never returned by `list_dates`.
const LATEST_ALIAS: &str = "latest";

/// Flat directory of one JSON file per report, keyed by `YYYY-MM-DD`.
///
/// Writes go to a temporary file in the same directory and are renamed over
/// the final path, so a concurrent reader sees either the previous report or
/// the new one, never a partial write.
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.json"))
    }

    fn write_atomic(&self, stem: &str, report: &Report) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(report)
            .map_err(|e| StoreError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?;

        let tmp_path = self.dir.join(format!("{stem}.json.tmp"));
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, self.path_for(stem))?;
        Ok(())
    }

    /// Persist `report` under its date, overwriting any previous report for
    /// that date wholesale.
    pub fn put(&self, report: &Report) -> Result<(), StoreError> {
        let stem = report.date.format(DATE_FORMAT).to_string();
        self.write_atomic(&stem, report)?;

        if let Err(e) = self.write_atomic(LATEST_ALIAS, report) {
            warn!("Failed to refresh {} alias: {}", LATEST_ALIAS, e);
        }

        info!(
            "Stored report for {} ({} attacks, {} lessons)",
            stem,
            report.ranked_attacks.len(),
            report.lessons.len()
        );
        Ok(())
    }

    /// Fetch the report for `date`. `Ok(None)` means no report was ever
    /// produced for that date; a record that exists but cannot be decoded
    /// surfaces as [`StoreError::Corrupt`].
    pub fn get(&self, date: NaiveDate) -> Result<Option<Report>, StoreError> {
        let stem = date.format(DATE_FORMAT).to_string();

        let bytes = match fs::read(self.path_for(&stem)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let report = serde_json::from_slice(&bytes)
            .map_err(|source| StoreError::Corrupt { key: stem, source })?;
        Ok(Some(report))
    }

    /// All report dates, most recent first. Only filenames whose stem is an
    /// exact `YYYY-MM-DD` count; the latest alias and stray files are skipped.
    pub fn list_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let mut dates = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            let Ok(date) = NaiveDate::parse_from_str(stem, DATE_FORMAT) else {
                debug!("Skipping non-report file: {}", name);
                continue;
            };
            // chrono accepts unpadded fields, so require an exact round-trip.
            if date.format(DATE_FORMAT).to_string() != stem {
                debug!("Skipping non-canonical report key: {}", name);
                continue;
            }

            dates.push(date);
        }

        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }
}
