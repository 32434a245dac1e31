use anyhow::Context;
use clap::{Parser, Subcommand};
use log::warn;
use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::domain::track::{Blob, Track, TrackForm, TrackId};
use crate::http::server::{HttpServer, Library};
use crate::library::list::{Audience, TrackList};
use crate::library::mutations::{MutationReport, TrackLibrary};
use crate::storage::key::KeyResolver;
use crate::storage::objects::{FsObjectStore, is_music_file};
use crate::storage::records::{Order, SqliteStore};

#[derive(Parser)]
#[command(name = "trackshelf")]
#[command(version = "0.1")]
#[command(about = "Audio track library with object storage")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tracks, newest first
    List {
        /// Include unpublished tracks
        #[arg(short, long)]
        all: bool,
        /// Only show tracks whose title or description contains this text
        #[arg(short, long, default_value = "")]
        query: String,
        /// List oldest tracks first
        #[arg(long)]
        oldest_first: bool,
    },
    /// Upload an audio file as a new track
    Upload {
        file: PathBuf,
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Change a track's metadata, or replace its audio file
    Edit {
        id: TrackId,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// New audio file replacing the current one
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Delete a track and its audio file
    Delete { id: TrackId },
    /// Print the storage key a stored reference resolves to
    ResolveKey { reference: String },
    /// Run http server hosting the library
    Serve,
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = Config::load(&cli.config.to_string_lossy())?;

    match cli.command {
        Commands::List {
            all,
            query,
            oldest_first,
        } => {
            let records = open_records(&cfg.database)?;
            let order = if oldest_first {
                Order::OldestFirst
            } else {
                Order::NewestFirst
            };
            let mut list = TrackList::with_order(order);
            list.load(&records)?;

            let audience = if all {
                Audience::Admin
            } else {
                Audience::Visitor
            };
            let tracks = list.listing(audience, &query);
            if tracks.is_empty() {
                println!("No tracks found");
            }
            for track in tracks {
                print_track(track, all);
            }
        }

        Commands::Upload {
            file,
            title,
            description,
        } => {
            let library = open_library(&cfg)?;
            let blob = read_blob(&file)?;

            let report = library.create(TrackForm {
                title,
                description,
                blob: Some(blob),
            })?;
            println!("Uploaded track {}", report.track);
            print_warnings(&report);
        }

        Commands::Edit {
            id,
            title,
            description,
            file,
        } => {
            let library = open_library(&cfg)?;
            library.refresh()?;
            let current = library.begin_edit(id)?;

            let blob = file.as_deref().map(read_blob).transpose()?;
            let form = TrackForm {
                title: title.unwrap_or(current.title),
                description: description.unwrap_or(current.description),
                blob,
            };

            let result = library.update(id, form);
            library.cancel_edit();
            let report = result?;
            println!("Updated track {}", report.track);
            print_warnings(&report);
        }

        Commands::Delete { id } => {
            let library = open_library(&cfg)?;
            library.refresh()?;

            let report = library.delete(id)?;
            println!("Deleted track {}", report.track);
            print_warnings(&report);
        }

        Commands::ResolveKey { reference } => {
            let resolver = KeyResolver::new(&cfg.objects.bucket);
            match resolver.resolve(Some(&reference)) {
                Some(key) => println!("{key}"),
                None => anyhow::bail!("{reference:?} does not resolve to a storage key"),
            }
        }

        Commands::Serve => {
            println!("Starting HTTP server...");

            let library = open_library(&cfg)?;
            let http_server = HttpServer::new(library, cfg.http);

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }
    }

    Ok(())
}

fn open_library(cfg: &Config) -> anyhow::Result<Library> {
    let objects = FsObjectStore::new(&cfg.objects).with_context(|| {
        format!(
            "Failed to open object storage at {}",
            cfg.objects.root.display()
        )
    })?;
    let records = open_records(&cfg.database)?;

    Ok(TrackLibrary::new(
        objects,
        records,
        &cfg.objects.bucket,
        cfg.mutation_policy(),
    ))
}

fn open_records(db: &config::Database) -> anyhow::Result<SqliteStore> {
    SqliteStore::new(db).context("Failed to open track database")
}

fn read_blob(path: &Path) -> anyhow::Result<Blob> {
    if !is_music_file(path) {
        warn!("{} does not look like an audio file", path.display());
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Blob::new(file_name, bytes))
}

fn print_track(track: &Track, show_state: bool) {
    println!("Track {}: {}", track.id, track.title);
    if !track.description.is_empty() {
        println!("  {}", track.description);
    }
    println!("  Added: {}", track.created_at.format("%Y-%m-%d %H:%M"));
    if show_state && !track.is_visible() {
        println!("  Unpublished");
    }
    match &track.public_url {
        Some(url) => println!("  URL: {url}"),
        None => println!("  No audio file"),
    }
}

fn print_warnings(report: &MutationReport) {
    for warning in &report.warnings {
        println!("  Warning: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_edit_with_partial_fields() {
        let cli = Cli::try_parse_from(["trackshelf", "edit", "7", "--title", "New"]).unwrap();
        match cli.command {
            Commands::Edit {
                id,
                title,
                description,
                file,
            } => {
                assert_eq!(id, TrackId(7));
                assert_eq!(title.as_deref(), Some("New"));
                assert!(description.is_none());
                assert!(file.is_none());
            }
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn rejects_non_numeric_id() {
        assert!(Cli::try_parse_from(["trackshelf", "delete", "abc"]).is_err());
    }

    #[test]
    fn read_blob_keeps_file_name() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("take 1.mp3");
        std::fs::write(&path, b"abc")?;

        let blob = read_blob(&path)?;

        assert_eq!(blob.file_name, "take 1.mp3");
        assert_eq!(blob.len(), 3);
        Ok(())
    }
}
