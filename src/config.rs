use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

use crate::library::mutations::{DeletePolicy, MutationPolicy};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub database: Database,
    pub objects: ObjectStorage,
    #[serde(default)]
    pub uploads: Uploads,
    #[serde(default)]
    pub library: Library,
    pub http: HttpConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }

    pub fn mutation_policy(&self) -> MutationPolicy {
        MutationPolicy {
            max_upload_bytes: self.uploads.max_size_mb.saturating_mul(1024 * 1024),
            content_type: self.uploads.content_type.clone(),
            delete: self.library.delete_policy,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub in_memory: bool,
    pub path: Option<PathBuf>,
}

/// Filesystem-backed object store
#[derive(Debug, Deserialize, Clone)]
pub struct ObjectStorage {
    pub root: PathBuf,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Base of every public object URL, e.g. `http://127.0.0.1:8080`
    pub public_base_url: String,
}

fn default_bucket() -> String {
    "audio".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Uploads {
    pub max_size_mb: u64,
    pub content_type: String,
}

impl Default for Uploads {
    fn default() -> Self {
        Self {
            max_size_mb: 50,
            content_type: "audio/mpeg".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Library {
    #[serde(default)]
    pub delete_policy: DeletePolicy,
}
