use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::datetime::{ISO_DATE_FORMAT, parse_iso_date};
use crate::record::Record;

pub const DOCUMENT_FILE: &str = "planner_data.json";
/// Holds the date of the last rollover pass, one ISO date per file.
pub const ROLLOVER_STAMP_FILE: &str = "last_rollover";

/// On-disk shape of the planner document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    #[serde(default)]
    pub tasks: Vec<Record>,

    #[serde(default)]
    pub backlog: Vec<Record>,
}

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub document_path: PathBuf,
    pub rollover_stamp_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let document_path = data_dir.join(DOCUMENT_FILE);
        let rollover_stamp_path = data_dir.join(ROLLOVER_STAMP_FILE);

        info!(
            data_dir = %data_dir.display(),
            document = %document_path.display(),
            exists = document_path.exists(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            document_path,
            rollover_stamp_path,
        })
    }

    /// A missing document is an empty planner, not an error.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Document> {
        if !self.document_path.exists() {
            debug!(file = %self.document_path.display(), "no planner document yet");
            return Ok(Document::default());
        }
        load_document(&self.document_path)
            .with_context(|| format!("failed to load {}", self.document_path.display()))
    }

    #[tracing::instrument(skip(self, document))]
    pub fn save(&self, document: &Document) -> anyhow::Result<()> {
        save_document_atomic(&self.document_path, document)
            .with_context(|| format!("failed to save {}", self.document_path.display()))
    }

    /// An unreadable stamp is treated as no stamp so the next pass rewrites it.
    #[tracing::instrument(skip(self))]
    pub fn last_rollover(&self) -> anyhow::Result<Option<NaiveDate>> {
        if !self.rollover_stamp_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.rollover_stamp_path).with_context(|| {
            format!("failed to read {}", self.rollover_stamp_path.display())
        })?;
        match parse_iso_date(raw.trim()) {
            Ok(date) => Ok(Some(date)),
            Err(err) => {
                warn!(
                    file = %self.rollover_stamp_path.display(),
                    error = %err,
                    "ignoring unreadable rollover stamp"
                );
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn record_rollover(&self, date: NaiveDate) -> anyhow::Result<()> {
        let dir = self
            .rollover_stamp_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        writeln!(temp, "{}", date.format(ISO_DATE_FORMAT))?;
        temp.persist(&self.rollover_stamp_path).map_err(|err| {
            anyhow!(
                "failed to persist {}: {}",
                self.rollover_stamp_path.display(),
                err
            )
        })?;
        debug!(%date, "recorded rollover stamp");
        Ok(())
    }
}

#[tracing::instrument(skip(path))]
fn load_document(path: &Path) -> anyhow::Result<Document> {
    debug!(file = %path.display(), "loading planner document");
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Document::default());
    }

    let document: Document = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {}", path.display()))?;

    debug!(
        tasks = document.tasks.len(),
        backlog = document.backlog.len(),
        "loaded planner document"
    );
    Ok(document)
}

#[tracing::instrument(skip(path, document))]
fn save_document_atomic(path: &Path, document: &Document) -> anyhow::Result<()> {
    debug!(
        file = %path.display(),
        tasks = document.tasks.len(),
        backlog = document.backlog.len(),
        "saving planner document atomically"
    );

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, document)?;
        writeln!(writer)?;
        writer.flush()?;
    }

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{DOCUMENT_FILE, DataStore, Document, ROLLOVER_STAMP_FILE};
    use crate::record::{Category, Priority, Record};

    #[test]
    fn missing_document_loads_empty() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        assert_eq!(store.load().expect("load"), Document::default());
    }

    #[test]
    fn empty_file_loads_empty() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join(DOCUMENT_FILE), "\n").expect("write");
        let store = DataStore::open(temp.path()).expect("open datastore");
        assert_eq!(store.load().expect("load"), Document::default());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join(DOCUMENT_FILE), "{\"tasks\": [").expect("write");
        let store = DataStore::open(temp.path()).expect("open datastore");
        let err = store.load().expect_err("malformed json must fail");
        assert!(format!("{err:#}").contains(DOCUMENT_FILE));
    }

    #[test]
    fn save_writes_tasks_and_backlog_keys() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        let now = NaiveDate::from_ymd_opt(2024, 6, 12)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid datetime");
        let document = Document {
            tasks: vec![Record::new(
                "Laundry".to_string(),
                Category::Daily,
                Priority::Medium,
                NaiveDate::from_ymd_opt(2024, 6, 12),
                now,
            )],
            backlog: vec![],
        };
        store.save(&document).expect("save");

        let raw = std::fs::read_to_string(&store.document_path).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(value["tasks"][0]["due_date"], "2024-06-12");
        assert_eq!(value["tasks"][0]["created_date"], "2024-06-12T09:00:00");
        assert!(value["backlog"].as_array().is_some_and(|b| b.is_empty()));
        assert_eq!(store.load().expect("reload"), document);
    }

    #[test]
    fn rollover_stamp_round_trips_and_tolerates_garbage() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        assert_eq!(store.last_rollover().expect("no stamp"), None);

        let day = NaiveDate::from_ymd_opt(2024, 6, 12).expect("valid date");
        store.record_rollover(day).expect("record stamp");
        assert_eq!(store.last_rollover().expect("stamp"), Some(day));

        std::fs::write(temp.path().join(ROLLOVER_STAMP_FILE), "not a date\n").expect("write");
        assert_eq!(store.last_rollover().expect("garbage stamp"), None);
    }
}
