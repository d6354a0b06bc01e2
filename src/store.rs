//! Versioned result snapshots
//!
//! Each analysis kind (rules, segments) has exactly one current snapshot.
//! Publishing replaces it wholesale; readers see either the previous or the
//! new snapshot, never a mixture.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{AnalysisError, Result};
use crate::rules::RuleRecord;
use crate::segment::CustomerSegment;

/// One published result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// Increments by one on every publish of the same kind
    pub version: u64,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<T>,
}

impl<T> Snapshot<T> {
    fn next(previous: Option<&Snapshot<T>>, records: Vec<T>) -> Self {
        Self {
            version: previous.map_or(1, |s| s.version + 1),
            generated_at: Utc::now(),
            records,
        }
    }
}

pub type RuleSnapshot = Snapshot<RuleRecord>;
pub type SegmentSnapshot = Snapshot<CustomerSegment>;

/// Destination for completed analysis results
pub trait ResultStore {
    fn publish_rules(&self, rules: Vec<RuleRecord>) -> Result<RuleSnapshot>;
    fn publish_segments(&self, segments: Vec<CustomerSegment>) -> Result<SegmentSnapshot>;
    fn latest_rules(&self) -> Result<Option<RuleSnapshot>>;
    fn latest_segments(&self) -> Result<Option<SegmentSnapshot>>;
    /// Drop both result sets
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct Slots {
    rules: Option<RuleSnapshot>,
    segments: Option<SegmentSnapshot>,
}

/// In-process store for hosts that keep results in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<Slots>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slots<R>(&self, f: impl FnOnce(&mut Slots) -> R) -> Result<R> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| AnalysisError::Computation("result store lock poisoned".to_string()))?;
        Ok(f(&mut slots))
    }
}

impl ResultStore for MemoryStore {
    fn publish_rules(&self, rules: Vec<RuleRecord>) -> Result<RuleSnapshot> {
        self.with_slots(|slots| {
            let snapshot = Snapshot::next(slots.rules.as_ref(), rules);
            slots.rules = Some(snapshot.clone());
            snapshot
        })
    }

    fn publish_segments(&self, segments: Vec<CustomerSegment>) -> Result<SegmentSnapshot> {
        self.with_slots(|slots| {
            let snapshot = Snapshot::next(slots.segments.as_ref(), segments);
            slots.segments = Some(snapshot.clone());
            snapshot
        })
    }

    fn latest_rules(&self) -> Result<Option<RuleSnapshot>> {
        self.with_slots(|slots| slots.rules.clone())
    }

    fn latest_segments(&self) -> Result<Option<SegmentSnapshot>> {
        self.with_slots(|slots| slots.segments.clone())
    }

    fn clear(&self) -> Result<()> {
        self.with_slots(|slots| *slots = Slots::default())
    }
}

const RULES_FILE: &str = "rules.json";
const SEGMENTS_FILE: &str = "segments.json";

/// Directory of JSON snapshots, one file per analysis kind
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the previous snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a store directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Option<Snapshot<T>>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(fs::File::open(&path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    fn replace<T: Serialize + DeserializeOwned>(
        &self,
        file: &str,
        records: Vec<T>,
    ) -> Result<Snapshot<T>> {
        let previous = self.read::<T>(file)?;
        let snapshot = Snapshot::next(previous.as_ref(), records);

        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(self.dir.join(file)).map_err(|e| e.error)?;

        tracing::info!(
            file,
            version = snapshot.version,
            records = snapshot.records.len(),
            "snapshot published"
        );
        Ok(snapshot)
    }

    fn remove(&self, file: &str) -> Result<()> {
        match fs::remove_file(self.dir.join(file)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl ResultStore for JsonFileStore {
    fn publish_rules(&self, rules: Vec<RuleRecord>) -> Result<RuleSnapshot> {
        self.replace(RULES_FILE, rules)
    }

    fn publish_segments(&self, segments: Vec<CustomerSegment>) -> Result<SegmentSnapshot> {
        self.replace(SEGMENTS_FILE, segments)
    }

    fn latest_rules(&self) -> Result<Option<RuleSnapshot>> {
        self.read(RULES_FILE)
    }

    fn latest_segments(&self) -> Result<Option<SegmentSnapshot>> {
        self.read(SEGMENTS_FILE)
    }

    fn clear(&self) -> Result<()> {
        self.remove(RULES_FILE)?;
        self.remove(SEGMENTS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::tests::customer;
    use crate::segment::SegmentLabel;
    use tempfile::tempdir;

    fn rule(antecedents: &str, consequents: &str, confidence: f64) -> RuleRecord {
        RuleRecord {
            antecedents: antecedents.to_string(),
            consequents: consequents.to_string(),
            support: 0.1,
            confidence,
            lift: 1.5,
        }
    }

    fn check_replace_semantics(store: &dyn ResultStore) {
        assert!(store.latest_rules().unwrap().is_none());

        let first = store
            .publish_rules(vec![rule("A", "B", 0.9), rule("C", "D", 0.8)])
            .unwrap();
        assert_eq!(first.version, 1);

        let second = store.publish_rules(vec![rule("E", "F", 0.7)]).unwrap();
        assert_eq!(second.version, 2);

        let latest = store.latest_rules().unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.records, vec![rule("E", "F", 0.7)]);

        let segments = vec![CustomerSegment {
            rfm: customer("c1", 3, 2, 40.0),
            cluster_id: 1,
            label: SegmentLabel::Potential,
        }];
        let published = store.publish_segments(segments.clone()).unwrap();
        assert_eq!(published.version, 1);
        assert_eq!(store.latest_segments().unwrap().unwrap().records, segments);

        store.clear().unwrap();
        assert!(store.latest_rules().unwrap().is_none());
        assert!(store.latest_segments().unwrap().is_none());
    }

    #[test]
    fn test_memory_store() {
        check_replace_semantics(&MemoryStore::new());
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("results")).unwrap();
        check_replace_semantics(&store);
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = tempdir().unwrap();
        JsonFileStore::open(dir.path())
            .unwrap()
            .publish_rules(vec![rule("A", "B", 0.9)])
            .unwrap();

        let reopened = JsonFileStore::open(dir.path()).unwrap();
        let latest = reopened.latest_rules().unwrap().unwrap();
        assert_eq!(latest.version, 1);
        assert_eq!(latest.records.len(), 1);

        // Only the snapshot itself is left behind, no temp files
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_corrupt_snapshot_keeps_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(RULES_FILE), "not json").unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        assert!(store.publish_rules(vec![rule("A", "B", 0.9)]).is_err());
        let contents = fs::read_to_string(dir.path().join(RULES_FILE)).unwrap();
        assert_eq!(contents, "not json");
    }
}
