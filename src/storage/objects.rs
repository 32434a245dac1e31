//! Key-addressed blob storage

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Component, Path, PathBuf},
};

use crate::{config, public_endpoint::public_object_url, storage::error::StorageError};

const MUSIC_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "m4a", "ogg", "aac"];

#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// When false an existing object under the same key is an error
    pub overwrite: bool,
    pub content_type: String,
}

pub trait ObjectStore {
    fn upload(&self, key: &str, bytes: &[u8], options: &UploadOptions) -> Result<(), StorageError>;

    /// Address the object under `key` is publicly fetched from
    fn public_url(&self, key: &str) -> String;

    /// Returns how many of `keys` were actually removed. Missing keys are
    /// skipped, not reported as errors.
    fn remove(&self, keys: &[String]) -> Result<usize, StorageError>;
}

/// Objects laid out as `<root>/<bucket>/<key>` on the local file system
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(config: &config::ObjectStorage) -> Result<Self, StorageError> {
        let store = Self {
            root: config.root.clone(),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        };
        fs::create_dir_all(store.bucket_dir())?;
        Ok(store)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    /// Path of the object on disk. Rejects keys that would escape the bucket.
    pub fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.bucket_dir().join(relative))
    }

    /// Reads an object for serving, `None` when there is no such object
    pub fn open(&self, key: &str) -> Result<Option<fs::File>, StorageError> {
        let path = self.object_path(key)?;
        match fs::File::open(&path) {
            Ok(file) if is_valid_object_path(&path) => Ok(Some(file)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn upload(&self, key: &str, bytes: &[u8], options: &UploadOptions) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut open = OpenOptions::new();
        open.write(true);
        if options.overwrite {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }

        let mut file = match open.open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::ObjectExists(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes)?;
        file.sync_all()?;

        log::debug!(
            "stored object {key} ({} bytes, {})",
            bytes.len(),
            options.content_type
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(&self.public_base_url, &self.bucket, key)
    }

    fn remove(&self, keys: &[String]) -> Result<usize, StorageError> {
        let mut removed = 0;
        for key in keys {
            let path = self.object_path(key)?;
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    log::debug!("object {key} not present, nothing to remove");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

pub fn is_music_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MUSIC_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Best-effort check that a path points to a regular file
fn is_valid_object_path(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file(),
        Err(_) => false,
    }
}
