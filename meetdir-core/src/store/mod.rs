//! Append-only record store.
//!
//! The log is a JSON-lines file. Lines are never rewritten except by
//! [`Store::compact`]. The in-memory index is a disposable view rebuilt by
//! replaying the log, where the highest `seq` per key wins.

mod lock;

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::MeetDirResult;
use crate::record::{
    CheckpointSource, Checkpoints, IgnoredSeries, LogEntry, MeetingRecord, Record, RecordKey,
    RecordKind, RecurrencePattern, Removal, SyncCheckpoint, TagDefinition,
};

pub use lock::StoreLock;

const LOG_FILE: &str = "meetings.jsonl";
const LOCK_FILE: &str = "meetdir.lock";

/// Outcome of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Lines decoded into entries.
    pub entries: usize,
    /// Malformed lines skipped.
    pub skipped: usize,
}

pub struct Store {
    log_path: PathBuf,
    log: File,
    index: HashMap<RecordKey, LogEntry>,
    next_seq: u64,
    _lock: StoreLock,
}

impl Store {
    /// Open (creating if needed) the log in `data_dir`, take the writer lock
    /// and replay it.
    pub fn open(data_dir: &Path) -> MeetDirResult<Self> {
        std::fs::create_dir_all(data_dir)?;

        let lock = StoreLock::acquire(&data_dir.join(LOCK_FILE))?;
        debug!(path = %lock.path().display(), "Acquired store lock");
        let log_path = data_dir.join(LOG_FILE);
        let log = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&log_path)?;

        let mut store = Store {
            log_path,
            log,
            index: HashMap::new(),
            next_seq: 1,
            _lock: lock,
        };
        store.terminate_partial_line()?;
        store.load()?;
        Ok(store)
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Directory holding the log (and the lock file).
    pub fn data_dir(&self) -> &Path {
        self.log_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Rebuild the index by replaying the whole log.
    pub fn load(&mut self) -> MeetDirResult<LoadStats> {
        self.index.clear();
        self.next_seq = 1;

        let mut stats = LoadStats::default();
        let reader = BufReader::new(File::open(&self.log_path)?);

        for (line_num, bytes) in reader.split(b'\n').enumerate() {
            let bytes = bytes?;
            let Ok(line) = String::from_utf8(bytes) else {
                warn!(line = line_num + 1, "Skipping non UTF-8 log line");
                stats.skipped += 1;
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => {
                    stats.entries += 1;
                    self.index_entry(entry);
                }
                Err(e) => {
                    warn!(line = line_num + 1, error = %e, "Skipping malformed log line");
                    stats.skipped += 1;
                }
            }
        }

        debug!(
            entries = stats.entries,
            skipped = stats.skipped,
            keys = self.index.len(),
            "Replayed record log"
        );
        Ok(stats)
    }

    fn index_entry(&mut self, entry: LogEntry) {
        self.next_seq = self.next_seq.max(entry.seq + 1);

        let key = entry.record.key();
        match self.index.get(&key) {
            Some(existing) if existing.seq > entry.seq => {}
            _ => {
                self.index.insert(key, entry);
            }
        }
    }

    /// Append one record as a single line and index it.
    pub fn append(&mut self, record: Record) -> MeetDirResult<u64> {
        let entry = LogEntry {
            seq: self.next_seq,
            at: Utc::now(),
            record,
        };

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        self.log.write_all(line.as_bytes())?;
        self.log.flush()?;

        let seq = entry.seq;
        self.index_entry(entry);
        Ok(seq)
    }

    pub fn append_all(&mut self, records: impl IntoIterator<Item = Record>) -> MeetDirResult<usize> {
        let mut count = 0;
        for record in records {
            self.append(record)?;
            count += 1;
        }
        if count > 0 {
            self.log.sync_data()?;
        }
        Ok(count)
    }

    /// Rewrite the log keeping only the winning entry per key. Returns the
    /// number of lines dropped.
    pub fn compact(&mut self) -> MeetDirResult<usize> {
        let before = line_count(&self.log_path)?;

        let mut entries: Vec<LogEntry> = self
            .index
            .values()
            .filter(|e| !matches!(e.record, Record::Removed(_)))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.seq);
        let kept = entries.len();

        let temp = self.log_path.with_extension("jsonl.compact");
        {
            let mut out = File::create(&temp)?;
            for entry in &entries {
                let mut line = serde_json::to_string(entry)?;
                line.push('\n');
                out.write_all(line.as_bytes())?;
            }
            out.sync_all()?;
        }
        std::fs::rename(&temp, &self.log_path)?;

        self.log = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.log_path)?;
        self.load()?;

        let removed = before.saturating_sub(kept);
        info!(removed, kept, "Compacted record log");
        Ok(removed)
    }

    /// A crash mid-append can leave a line without its newline; terminate it
    /// so the next append starts on a fresh line.
    fn terminate_partial_line(&mut self) -> MeetDirResult<()> {
        let len = self.log.metadata()?.len();
        if len == 0 {
            return Ok(());
        }

        let mut reader = File::open(&self.log_path)?;
        reader.seek(SeekFrom::Start(len - 1))?;
        let mut last = [0u8; 1];
        reader.read_exact(&mut last)?;

        if last[0] != b'\n' {
            warn!("Record log ends with a partial line; terminating it");
            self.log.write_all(b"\n")?;
        }
        Ok(())
    }

    fn live(&self, kind: RecordKind) -> impl Iterator<Item = &Record> {
        self.index
            .iter()
            .filter(move |(key, _)| key.kind == kind)
            .map(|(_, entry)| &entry.record)
    }

    fn get(&self, kind: RecordKind, id: &str) -> Option<&Record> {
        self.index
            .get(&RecordKey::new(kind, id))
            .map(|entry| &entry.record)
    }

    // MEETINGS:

    pub fn meeting(&self, stable_id: &str) -> Option<&MeetingRecord> {
        match self.get(RecordKind::Meeting, stable_id) {
            Some(Record::Meeting(m)) => Some(m),
            _ => None,
        }
    }

    pub fn meetings(&self) -> impl Iterator<Item = &MeetingRecord> {
        self.live(RecordKind::Meeting).filter_map(|r| match r {
            Record::Meeting(m) => Some(m),
            _ => None,
        })
    }

    pub fn put_meeting(&mut self, meeting: MeetingRecord) -> MeetDirResult<u64> {
        self.append(Record::Meeting(meeting))
    }

    // PATTERNS:

    pub fn pattern(&self, signature: &str) -> Option<&RecurrencePattern> {
        match self.get(RecordKind::Pattern, signature) {
            Some(Record::Pattern(p)) => Some(p),
            _ => None,
        }
    }

    pub fn patterns(&self) -> impl Iterator<Item = &RecurrencePattern> {
        self.live(RecordKind::Pattern).filter_map(|r| match r {
            Record::Pattern(p) => Some(p),
            _ => None,
        })
    }

    // TAGS:

    pub fn tag(&self, name: &str) -> Option<&TagDefinition> {
        match self.get(RecordKind::Tag, name) {
            Some(Record::Tag(t)) => Some(t),
            _ => None,
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &TagDefinition> {
        self.live(RecordKind::Tag).filter_map(|r| match r {
            Record::Tag(t) => Some(t),
            _ => None,
        })
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tag(name).is_some()
    }

    // IGNORED SERIES:

    pub fn ignored(&self) -> impl Iterator<Item = &IgnoredSeries> {
        self.live(RecordKind::Ignored).filter_map(|r| match r {
            Record::Ignored(i) => Some(i),
            _ => None,
        })
    }

    pub fn is_ignored(&self, signature: &str) -> bool {
        matches!(
            self.get(RecordKind::Ignored, signature),
            Some(Record::Ignored(_))
        )
    }

    // CHECKPOINTS:

    pub fn checkpoint(&self, source: CheckpointSource) -> Option<&SyncCheckpoint> {
        match self.get(RecordKind::Sync, source.as_str()) {
            Some(Record::Sync(s)) => Some(s),
            _ => None,
        }
    }

    pub fn checkpoints(&self) -> Checkpoints {
        Checkpoints {
            calendar: self.checkpoint(CheckpointSource::Calendar).cloned(),
            transcripts: self.checkpoint(CheckpointSource::Transcripts).cloned(),
        }
    }

    /// Append a tombstone for `kind`/`key`.
    pub fn remove(&mut self, kind: RecordKind, key: &str) -> MeetDirResult<u64> {
        self.append(Record::Removed(Removal {
            kind,
            key: key.to_string(),
        }))
    }
}

fn line_count(path: &Path) -> MeetDirResult<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for bytes in reader.split(b'\n') {
        if !bytes?.iter().all(u8::is_ascii_whitespace) {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeetDirError;
    use crate::record::{MeetingStatus, make_record};

    fn tag(name: &str) -> Record {
        Record::Tag(TagDefinition::new(name, "", None, Utc::now()))
    }

    #[test]
    fn test_append_and_reload_keeps_last_record_per_key() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut store = Store::open(dir.path()).unwrap();
            let mut record = make_record("evt1", "Team Standup");
            store.put_meeting(record.clone()).unwrap();

            record.title = "Team Standup (renamed)".to_string();
            store.put_meeting(record).unwrap();
            store.put_meeting(make_record("evt2", "Planning")).unwrap();
        }

        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.meetings().count(), 2);
        assert_eq!(
            store.meeting("evt1").unwrap().title,
            "Team Standup (renamed)"
        );
    }

    #[test]
    fn test_replay_orders_by_sequence_not_line_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut newer = make_record("evt1", "Newer");
        newer.status = MeetingStatus::Discovered;
        let older = make_record("evt1", "Older");

        let lines = [
            LogEntry {
                seq: 5,
                at: Utc::now(),
                record: Record::Meeting(newer),
            },
            LogEntry {
                seq: 2,
                at: Utc::now(),
                record: Record::Meeting(older),
            },
        ];
        let content: String = lines
            .iter()
            .map(|e| serde_json::to_string(e).unwrap() + "\n")
            .collect();
        std::fs::write(dir.path().join(LOG_FILE), content).unwrap();

        let mut store = Store::open(dir.path()).unwrap();
        assert_eq!(store.meeting("evt1").unwrap().title, "Newer");

        let seq = store.put_meeting(make_record("evt3", "Next")).unwrap();
        assert_eq!(seq, 6);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = Store::open(dir.path()).unwrap();
            store.put_meeting(make_record("evt1", "One")).unwrap();
        }

        let path = dir.path().join(LOG_FILE);
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{not json\n");
        content.push_str("{\"seq\":9,\"at\":\"2026-01-01T00:00:00Z\",\"record\":{\"type\":\"bogus\"}}\n");
        std::fs::write(&path, content).unwrap();

        let mut store = Store::open(dir.path()).unwrap();
        let stats = store.load().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.skipped, 2);
        assert!(store.meeting("evt1").is_some());
    }

    #[test]
    fn test_partial_trailing_line_does_not_corrupt_next_append() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = Store::open(dir.path()).unwrap();
            store.put_meeting(make_record("evt1", "One")).unwrap();
        }

        let path = dir.path().join(LOG_FILE);
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"seq\":2,\"at\":");
        std::fs::write(&path, content).unwrap();

        {
            let mut store = Store::open(dir.path()).unwrap();
            store.put_meeting(make_record("evt2", "Two")).unwrap();
        }

        let mut store = Store::open(dir.path()).unwrap();
        let stats = store.load().unwrap();
        assert_eq!(stats.skipped, 1);
        assert!(store.meeting("evt1").is_some());
        assert!(store.meeting("evt2").is_some());
    }

    #[test]
    fn test_removal_hides_record_until_reinserted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();

        store.append(tag("team")).unwrap();
        store.remove(RecordKind::Tag, "team").unwrap();
        assert!(!store.has_tag("team"));
        assert_eq!(store.tags().count(), 0);

        store.append(tag("team")).unwrap();
        assert!(store.has_tag("team"));
    }

    #[test]
    fn test_compact_keeps_only_winning_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();

        for i in 0..3 {
            let mut record = make_record("evt1", "Standup");
            record.title = format!("Standup v{}", i);
            store.put_meeting(record).unwrap();
        }
        store.append(tag("scratch")).unwrap();
        store.remove(RecordKind::Tag, "scratch").unwrap();
        store.append(tag("team")).unwrap();

        let removed = store.compact().unwrap();
        assert_eq!(removed, 4);
        assert_eq!(line_count(store.log_path()).unwrap(), 2);
        assert_eq!(store.meeting("evt1").unwrap().title, "Standup v2");
        assert!(store.has_tag("team"));
        assert!(!store.has_tag("scratch"));

        // appends keep working after the rewrite
        store.put_meeting(make_record("evt2", "Later")).unwrap();
        drop(store);
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.meetings().count(), 2);
    }

    #[test]
    fn test_compact_twice_keeps_the_same_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();
        store.put_meeting(make_record("evt1", "Standup")).unwrap();
        store.put_meeting(make_record("evt1", "Standup")).unwrap();
        store.append(tag("team")).unwrap();

        assert_eq!(store.compact().unwrap(), 1);
        assert_eq!(store.compact().unwrap(), 0);
        assert_eq!(line_count(store.log_path()).unwrap(), 2);
        assert_eq!(store.meeting("evt1").unwrap().title, "Standup");
        assert!(store.has_tag("team"));
    }

    #[test]
    fn test_second_writer_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let _store = Store::open(dir.path()).unwrap();

        match Store::open(dir.path()) {
            Err(MeetDirError::StoreLocked(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("second writer should be refused"),
        }
    }

    #[test]
    fn test_checkpoints_are_singletons_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path()).unwrap();

        let first = Checkpoints::default().advance(CheckpointSource::Calendar, Utc::now(), 3);
        store.append(Record::Sync(first)).unwrap();
        let second = store
            .checkpoints()
            .advance(CheckpointSource::Calendar, Utc::now(), 2);
        store.append(Record::Sync(second)).unwrap();

        let checkpoints = store.checkpoints();
        let calendar = checkpoints.calendar.unwrap();
        assert_eq!(calendar.last_count, 2);
        assert_eq!(calendar.total_processed, 5);
        assert!(checkpoints.transcripts.is_none());
    }
}
