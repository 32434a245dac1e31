//! Create, update and delete as ordered sequences of object-store and
//! metadata-store calls.
//!
//! The two stores have no shared transaction. Each sequence is ordered so a
//! failure between steps leaves at worst an orphaned blob, never a record
//! pointing at a blob that is gone. The one exception is strict delete, where
//! the blob is removed first and a failing record delete is reported.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{
    domain::track::{Blob, NewTrack, StoredObject, Track, TrackChanges, TrackForm, TrackId},
    library::{
        busy::BusyFlag,
        error::{ConsistencyError, LibraryError, Operation, OrphanWarning, ValidationError},
        list::{Audience, TrackList},
    },
    storage::{
        key::{KeyGenerator, KeyResolver},
        objects::{ObjectStore, UploadOptions},
        records::MetadataStore,
    },
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// How a track's record and blob are removed together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Remove the blob first and require it to be gone before deleting the
    /// record. A track with a bad key cannot be deleted until it is repaired.
    #[default]
    Strict,
    /// Delete the record first, then remove the blob best-effort. A failed
    /// removal leaves an orphaned blob and is reported as a warning.
    Tolerant,
}

#[derive(Debug, Clone)]
pub struct MutationPolicy {
    pub max_upload_bytes: u64,
    pub content_type: String,
    pub delete: DeletePolicy,
}

impl Default for MutationPolicy {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
            content_type: "audio/mpeg".to_string(),
            delete: DeletePolicy::Strict,
        }
    }
}

/// Outcome of a successful mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationReport {
    pub track: TrackId,
    pub warnings: Vec<OrphanWarning>,
}

impl MutationReport {
    fn clean(track: TrackId) -> Self {
        Self {
            track,
            warnings: Vec::new(),
        }
    }
}

/// Operator-side state: the track list and which track is being edited
#[derive(Debug, Default)]
struct AdminView {
    list: TrackList,
    editing: Option<TrackId>,
}

struct Validated {
    title: String,
    description: String,
    blob: Option<Blob>,
}

/// Keeps blobs and track records consistent across mutations
pub struct TrackLibrary<O, M> {
    objects: O,
    records: M,
    resolver: KeyResolver,
    keys: KeyGenerator,
    policy: MutationPolicy,
    busy: BusyFlag,
    view: Mutex<AdminView>,
}

impl<O: ObjectStore, M: MetadataStore> TrackLibrary<O, M> {
    pub fn new(objects: O, records: M, bucket: &str, policy: MutationPolicy) -> Self {
        Self {
            objects,
            records,
            resolver: KeyResolver::new(bucket),
            keys: KeyGenerator::default(),
            policy,
            busy: BusyFlag::default(),
            view: Mutex::new(AdminView::default()),
        }
    }

    pub fn with_key_generator(mut self, keys: KeyGenerator) -> Self {
        self.keys = keys;
        self
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    pub fn records(&self) -> &M {
        &self.records
    }

    pub fn policy(&self) -> &MutationPolicy {
        &self.policy
    }

    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    fn view(&self) -> MutexGuard<'_, AdminView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reloads the list from the metadata store. On error the previous list stays.
    pub fn refresh(&self) -> Result<Vec<Track>, LibraryError> {
        let mut view = self.view();
        let tracks = view
            .list
            .load(&self.records)
            .map_err(LibraryError::store(Operation::Select))?;
        Ok(tracks.to_vec())
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.view().list.tracks().to_vec()
    }

    pub fn find(&self, id: TrackId) -> Option<Track> {
        self.view().list.find(id).cloned()
    }

    pub fn listing(&self, audience: Audience, query: &str) -> Vec<Track> {
        self.view()
            .list
            .listing(audience, query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn begin_edit(&self, id: TrackId) -> Result<Track, LibraryError> {
        let mut view = self.view();
        let track = view
            .list
            .find(id)
            .cloned()
            .ok_or(ConsistencyError::NotInList(id))?;
        view.editing = Some(id);
        Ok(track)
    }

    pub fn cancel_edit(&self) {
        self.view().editing = None;
    }

    pub fn editing(&self) -> Option<TrackId> {
        self.view().editing
    }

    /// Uploads the blob, then inserts a published record pointing at it
    pub fn create(&self, form: TrackForm) -> Result<MutationReport, LibraryError> {
        let input = self.validate(form, true)?;
        let _busy = self.busy.try_acquire().ok_or(LibraryError::Busy)?;

        let result = self.create_inner(input);
        self.refetch_after_mutation();
        result
    }

    /// Rewrites title and description, and replaces the blob when one is given.
    ///
    /// The previous blob is only removed once the record points at the new one.
    pub fn update(&self, id: TrackId, form: TrackForm) -> Result<MutationReport, LibraryError> {
        let input = self.validate(form, false)?;
        let _busy = self.busy.try_acquire().ok_or(LibraryError::Busy)?;

        let result = self.update_inner(id, input);
        self.refetch_after_mutation();
        result
    }

    /// Removes both the record and its blob, ordered by the configured policy
    pub fn delete(&self, id: TrackId) -> Result<MutationReport, LibraryError> {
        let _busy = self.busy.try_acquire().ok_or(LibraryError::Busy)?;

        let result = self.delete_inner(id);
        self.refetch_after_mutation();
        result
    }

    fn validate(&self, form: TrackForm, require_blob: bool) -> Result<Validated, ValidationError> {
        if require_blob && form.blob.is_none() {
            return Err(ValidationError::MissingBlob);
        }

        let title = form.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }

        if let Some(blob) = &form.blob {
            if blob.is_empty() {
                return Err(ValidationError::EmptyBlob);
            }
            if blob.len() > self.policy.max_upload_bytes {
                return Err(ValidationError::TooLarge {
                    size_mb: blob.len() as f64 / BYTES_PER_MB,
                    limit_mb: self.policy.max_upload_bytes as f64 / BYTES_PER_MB,
                });
            }
        }

        Ok(Validated {
            title: title.to_string(),
            description: form.description.trim().to_string(),
            blob: form.blob,
        })
    }

    fn create_inner(&self, input: Validated) -> Result<MutationReport, LibraryError> {
        let blob = input.blob.ok_or(ValidationError::MissingBlob)?;
        let object = self.upload(&blob)?;

        let record = NewTrack {
            title: input.title,
            description: input.description,
            storage_key: object.key.clone(),
            public_url: object.public_url,
            published: true,
        };

        let id = self.records.insert(&record).map_err(|e| {
            log::error!("inserting track record failed, object {} is orphaned", object.key);
            LibraryError::store(Operation::Insert)(e)
        })?;

        self.view().editing = None;
        log::info!("created track {id} '{}' ({})", record.title, object.key);
        Ok(MutationReport::clean(id))
    }

    fn update_inner(&self, id: TrackId, input: Validated) -> Result<MutationReport, LibraryError> {
        let current = self.find(id).ok_or(ConsistencyError::NotInList(id))?;

        let object = match &input.blob {
            Some(blob) => Some(self.upload(blob)?),
            None => None,
        };
        let changes = TrackChanges {
            title: input.title,
            description: input.description,
            object,
        };

        let log_orphan = |changes: &TrackChanges| {
            if let Some(object) = &changes.object {
                log::error!("updating track {id} failed, object {} is orphaned", object.key);
            }
        };
        let affected = self.records.update(id, &changes).map_err(|e| {
            log_orphan(&changes);
            LibraryError::store(Operation::Update)(e)
        })?;
        if affected == 0 {
            log_orphan(&changes);
            return Err(ConsistencyError::NoRecordUpdated(id).into());
        }

        let mut report = MutationReport::clean(id);
        if let Some(object) = &changes.object {
            let replaced = self.resolver.resolve(current.storage_key.as_deref());
            if replaced.as_deref() != Some(object.key.as_str()) {
                report.warnings.extend(self.remove_best_effort(&current));
            }
        }

        self.view().editing = None;
        log::info!("updated track {id} '{}'", changes.title);
        Ok(report)
    }

    fn delete_inner(&self, id: TrackId) -> Result<MutationReport, LibraryError> {
        let track = self.find(id).ok_or(ConsistencyError::NotInList(id))?;

        let warnings = match self.policy.delete {
            DeletePolicy::Strict => {
                self.delete_strict(&track)?;
                Vec::new()
            }
            DeletePolicy::Tolerant => {
                self.delete_record(id)?;
                self.remove_best_effort(&track).into_iter().collect()
            }
        };

        {
            let mut view = self.view();
            view.list.remove(id);
            if view.editing == Some(id) {
                view.editing = None;
            }
        }

        log::info!("deleted track {id} '{}'", track.title);
        Ok(MutationReport {
            track: id,
            warnings,
        })
    }

    fn delete_strict(&self, track: &Track) -> Result<(), LibraryError> {
        let key = self
            .resolver
            .resolve(track.storage_key.as_deref())
            .ok_or_else(|| ConsistencyError::UnresolvableKey {
                track: track.id,
                reference: track.storage_key.clone(),
            })?;

        let removed = self
            .objects
            .remove(std::slice::from_ref(&key))
            .map_err(LibraryError::store(Operation::RemoveBlob))?;
        if removed == 0 {
            return Err(ConsistencyError::NothingRemoved {
                track: track.id,
                key,
            }
            .into());
        }

        self.delete_record(track.id).inspect_err(|_| {
            log::error!(
                "object {key} was removed but the record of track {} remains",
                track.id
            );
        })
    }

    fn delete_record(&self, id: TrackId) -> Result<(), LibraryError> {
        let affected = self
            .records
            .delete(id)
            .map_err(LibraryError::store(Operation::Delete))?;
        if affected == 0 {
            return Err(ConsistencyError::NoRecordDeleted(id).into());
        }
        Ok(())
    }

    fn upload(&self, blob: &Blob) -> Result<StoredObject, LibraryError> {
        let key = self.keys.next(&blob.file_name);
        let options = UploadOptions {
            overwrite: false,
            content_type: self.policy.content_type.clone(),
        };

        self.objects
            .upload(&key, &blob.bytes, &options)
            .map_err(LibraryError::store(Operation::Upload))?;

        let public_url = self.objects.public_url(&key);
        Ok(StoredObject { key, public_url })
    }

    /// Removes the blob a track referenced. Every failure becomes a warning.
    fn remove_best_effort(&self, track: &Track) -> Option<OrphanWarning> {
        let reference = track.storage_key.as_deref()?;

        let warning = match self.resolver.resolve(Some(reference)) {
            None => OrphanWarning {
                key: reference.to_string(),
                reason: "stored reference does not resolve to a key".to_string(),
            },
            Some(key) => match self.objects.remove(std::slice::from_ref(&key)) {
                Ok(0) => OrphanWarning {
                    key,
                    reason: "object store removed nothing".to_string(),
                },
                Ok(_) => return None,
                Err(e) => OrphanWarning {
                    key,
                    reason: e.to_string(),
                },
            },
        };

        log::warn!("track {}: {warning}", track.id);
        Some(warning)
    }

    fn refetch_after_mutation(&self) {
        if let Err(e) = self.refresh() {
            log::warn!("refreshing the track list after a change failed: {e}");
        }
    }
}
