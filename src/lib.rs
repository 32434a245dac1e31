//! Audio track library: blob and record lifecycle on top of an object store
//! and a metadata store, list views, and a single-channel playback core.

pub mod cli;
pub mod config;
pub mod domain;
pub mod http;
pub mod library;
pub mod playback;
pub mod public_endpoint;
pub mod storage;
