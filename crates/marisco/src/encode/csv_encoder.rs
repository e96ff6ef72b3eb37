//! Delimited-text output: one CSV per group plus a JSON attributes file.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::info;

use super::Encoder;
use super::attributes::GlobalAttributes;
use crate::error::{MariscoError, Result};
use crate::table::{Dataset, Table};

/// Writes `<stem>_<group>.csv` for every non-empty group and
/// `<stem>_attributes.json` into a destination directory.
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    dest_dir: PathBuf,
    stem: String,
    skip_empty: bool,
}

impl CsvEncoder {
    pub fn new(dest_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            stem: stem.into(),
            skip_empty: true,
        }
    }

    /// Also write header-only files for groups without rows.
    pub fn with_empty_groups(mut self) -> Self {
        self.skip_empty = false;
        self
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    fn group_path(&self, group: &str) -> PathBuf {
        self.dest_dir.join(format!("{}_{}.csv", self.stem, group))
    }

    fn attributes_path(&self) -> PathBuf {
        self.dest_dir.join(format!("{}_attributes.json", self.stem))
    }
}

/// Write one table as CSV. Missing values are empty fields.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|v| v.key()))?;
    }
    writer.flush().map_err(|e| MariscoError::io(path, e))?;
    Ok(())
}

impl Encoder for CsvEncoder {
    fn encode(&self, dataset: &Dataset, attrs: &GlobalAttributes) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dest_dir).map_err(|e| MariscoError::io(&self.dest_dir, e))?;

        let mut written = Vec::new();
        for (group, table) in dataset.iter() {
            if self.skip_empty && table.is_empty() {
                continue;
            }
            let path = self.group_path(group);
            write_table(table, &path)?;
            info!(group = %group, rows = table.row_count(), path = %path.display(), "Wrote group");
            written.push(path);
        }

        let path = self.attributes_path();
        let file = File::create(&path).map_err(|e| MariscoError::io(&path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), attrs)?;
        written.push(path);

        Ok(written)
    }
}
