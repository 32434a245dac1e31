//! Canonical object keys: resolving stored references and generating new keys

use std::{
    borrow::Cow,
    sync::{
        LazyLock,
        atomic::{AtomicI64, Ordering},
    },
};

use regex::Regex;
use url::Url;

use crate::{public_endpoint::object_path_marker, storage::db};

static UNSAFE_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]+").expect("static regex"));

/// Maps whatever a record stores as its blob reference to the canonical key.
///
/// Records written over time hold bare keys, `bucket/key` strings, or full
/// public URLs, so every lookup of an existing blob goes through here.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    bucket_prefix: String,
    marker: String,
}

impl KeyResolver {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket_prefix: format!("{bucket}/"),
            marker: object_path_marker(bucket),
        }
    }

    /// Returns `None` when there is no reference or it collapses to an empty key.
    pub fn resolve(&self, reference: Option<&str>) -> Option<String> {
        let reference = reference.filter(|r| !r.is_empty())?;

        let key = if reference.starts_with("http") {
            self.resolve_url(reference)
        } else if let Some(rest) = reference.strip_prefix(&self.bucket_prefix) {
            rest.to_string()
        } else {
            reference.trim_start_matches('/').to_string()
        };

        if key.is_empty() { None } else { Some(key) }
    }

    fn resolve_url(&self, reference: &str) -> String {
        let url = match Url::parse(reference) {
            Ok(url) => url,
            Err(e) => {
                log::debug!("reference {reference} is not a valid url ({e}), using it verbatim");
                return reference.trim_start_matches('/').to_string();
            }
        };
        let path = url.path();

        let tail = match path.find(&self.marker) {
            Some(idx) => &path[idx + self.marker.len()..],
            // no marker: only the last segment is trusted to be the key
            None => path.rsplit('/').next().unwrap_or_default(),
        };

        percent_decode(tail).trim_start_matches('/').to_string()
    }
}

fn percent_decode(s: &str) -> Cow<'_, str> {
    urlencoding::decode(s).unwrap_or(Cow::Borrowed(s))
}

/// Replaces every run of characters outside `[A-Za-z0-9_.-]` with `_`
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized = UNSAFE_NAME_CHARS.replace_all(name, "_");
    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized.into_owned()
    }
}

/// Produces collision-resistant keys of the form `<millis>_<sanitized name>`.
///
/// The millisecond stamp never repeats within one generator, even when the
/// clock does not advance between two calls.
#[derive(Debug)]
pub struct KeyGenerator {
    last_stamp: AtomicI64,
    clock: fn() -> i64,
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::with_clock(db::now_millis)
    }
}

impl KeyGenerator {
    pub fn with_clock(clock: fn() -> i64) -> Self {
        Self {
            last_stamp: AtomicI64::new(i64::MIN),
            clock,
        }
    }

    pub fn next(&self, file_name: &str) -> String {
        let now = (self.clock)();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        let stamp = now.max(previous.saturating_add(1));

        format!("{stamp}_{}", sanitize_file_name(file_name))
    }
}
