//! Recording in-memory stores for orchestrator tests

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
};

use anyhow::anyhow;
use chrono::DateTime;

use crate::{
    domain::track::{NewTrack, Track, TrackChanges, TrackId},
    storage::{
        error::StorageError,
        objects::{ObjectStore, UploadOptions},
        records::{MetadataStore, Order},
    },
};

/// Store calls in the order they were issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload(String),
    Remove(Vec<String>),
    Select,
    Insert(String),
    Update(TrackId),
    Delete(TrackId),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

pub fn position(log: &CallLog, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
    calls(log).iter().position(predicate)
}

pub fn track(id: i64, title: &str) -> Track {
    Track {
        id: TrackId(id),
        title: title.to_string(),
        description: String::new(),
        storage_key: Some(format!("{id}_{title}.mp3")),
        public_url: Some(format!(
            "http://test/storage/v1/object/public/audio/{id}_{title}.mp3"
        )),
        created_at: DateTime::from_timestamp_millis(1_700_000_000_000 + id).unwrap(),
        published: Some(true),
    }
}

#[derive(Debug, Default)]
pub struct FakeObjects {
    pub log: CallLog,
    objects: Mutex<HashSet<String>>,
    fail_upload: AtomicBool,
    fail_remove: AtomicBool,
}

impl FakeObjects {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: Arc::clone(log),
            ..Default::default()
        }
    }

    pub fn with_objects<'a>(log: &CallLog, keys: impl IntoIterator<Item = &'a str>) -> Self {
        let store = Self::new(log);
        store
            .objects
            .lock()
            .unwrap()
            .extend(keys.into_iter().map(str::to_string));
        store
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().iter().cloned().collect();
        keys.sort();
        keys
    }

    pub fn fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }
}

impl ObjectStore for FakeObjects {
    fn upload(&self, key: &str, _bytes: &[u8], options: &UploadOptions) -> Result<(), StorageError> {
        self.log.lock().unwrap().push(Call::Upload(key.to_string()));
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(StorageError::Internal(anyhow!("upload refused")));
        }
        let mut objects = self.objects.lock().unwrap();
        if !options.overwrite && objects.contains(key) {
            return Err(StorageError::ObjectExists(key.to_string()));
        }
        objects.insert(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("http://test/storage/v1/object/public/audio/{key}")
    }

    fn remove(&self, keys: &[String]) -> Result<usize, StorageError> {
        self.log.lock().unwrap().push(Call::Remove(keys.to_vec()));
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(StorageError::Internal(anyhow!("remove refused")));
        }
        let mut objects = self.objects.lock().unwrap();
        Ok(keys.iter().filter(|k| objects.remove(k.as_str())).count())
    }
}

#[derive(Debug, Default)]
pub struct FakeRecords {
    pub log: CallLog,
    rows: Mutex<Vec<Track>>,
    next_id: AtomicI64,
    fail_select: AtomicBool,
    fail_insert: AtomicBool,
    fail_update: AtomicBool,
    fail_delete: AtomicBool,
}

impl FakeRecords {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: Arc::clone(log),
            next_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self::with_log_and_tracks(&CallLog::default(), tracks)
    }

    pub fn with_log_and_tracks(log: &CallLog, tracks: Vec<Track>) -> Self {
        let store = Self::new(log);
        *store.rows.lock().unwrap() = tracks;
        store
    }

    pub fn get(&self, id: TrackId) -> Option<Track> {
        self.rows.lock().unwrap().iter().find(|t| t.id == id).cloned()
    }

    /// Removes a row behind the orchestrator's back
    pub fn forget(&self, id: TrackId) {
        self.rows.lock().unwrap().retain(|t| t.id != id);
    }

    pub fn fail_select(&self, fail: bool) {
        self.fail_select.store(fail, Ordering::SeqCst);
    }

    pub fn fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

impl MetadataStore for FakeRecords {
    fn select(&self, order: Order) -> Result<Vec<Track>, StorageError> {
        self.record(Call::Select);
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(StorageError::Internal(anyhow!("select refused")));
        }
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by_key(|t| (t.created_at, t.id));
        if order == Order::NewestFirst {
            rows.reverse();
        }
        Ok(rows)
    }

    fn insert(&self, record: &NewTrack) -> Result<TrackId, StorageError> {
        self.record(Call::Insert(record.title.clone()));
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StorageError::Internal(anyhow!("insert refused")));
        }
        let id = TrackId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.rows.lock().unwrap().push(Track {
            id,
            title: record.title.clone(),
            description: record.description.clone(),
            storage_key: Some(record.storage_key.clone()),
            public_url: Some(record.public_url.clone()),
            created_at: DateTime::from_timestamp_millis(1_800_000_000_000 + id.0).unwrap(),
            published: Some(record.published),
        });
        Ok(id)
    }

    fn update(&self, id: TrackId, changes: &TrackChanges) -> Result<usize, StorageError> {
        self.record(Call::Update(id));
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(StorageError::Internal(anyhow!("update refused")));
        }
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|t| t.id == id) else {
            return Ok(0);
        };
        row.title = changes.title.clone();
        row.description = changes.description.clone();
        if let Some(object) = &changes.object {
            row.storage_key = Some(object.key.clone());
            row.public_url = Some(object.public_url.clone());
        }
        Ok(1)
    }

    fn delete(&self, id: TrackId) -> Result<usize, StorageError> {
        self.record(Call::Delete(id));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Internal(anyhow!("delete refused")));
        }
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| t.id != id);
        Ok(before - rows.len())
    }
}
