use std::{io::Read, sync::Arc};

use chrono::{DateTime, Utc};
use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};

use crate::{
    config::HttpConfig,
    domain::track::{Blob, Track, TrackForm, TrackId},
    http::error::ApiError,
    library::{
        list::{Audience, TrackList},
        mutations::{MutationReport, TrackLibrary},
    },
    storage::{objects::FsObjectStore, records::SqliteStore},
};

pub type Library = TrackLibrary<FsObjectStore, SqliteStore>;

const DEFAULT_UPLOAD_NAME: &str = "upload.mp3";

pub struct HttpServer {
    library: Arc<Library>,
    pub config: HttpConfig,
}

impl HttpServer {
    pub fn new(library: Library, config: HttpConfig) -> Self {
        if let Err(e) = library.refresh() {
            log::warn!("initial track list load failed: {e}");
        }
        Self {
            library: Arc::new(library),
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = rouille::router!(request,
            (GET) (/tracks) => {
                self.handle_visitor_tracks(request)
            },
            (GET) (/admin/tracks) => {
                self.handle_admin_tracks(request)
            },
            (POST) (/admin/tracks) => {
                Self::respond(self.create_track(request), 201)
            },
            (PUT) (/admin/tracks/{id: String}) => {
                Self::respond(self.update_track(id, request), 200)
            },
            (DELETE) (/admin/tracks/{id: String}) => {
                Self::respond(self.delete_track(id), 200)
            },
            (GET) (/storage/v1/object/public/{bucket: String}/{key: String}) => {
                self.handle_object(bucket, key)
            },
            _ => Response::empty_404()
        );

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn respond<T: Serialize>(result: Result<T, ApiError>, status: u16) -> Response {
        match result {
            Ok(body) => Response::json(&body).with_status_code(status),
            Err(e) => e.into_response(),
        }
    }

    /// Published tracks only, read straight from the store on every request
    fn handle_visitor_tracks(&self, request: &Request) -> Response {
        let query = request.get_param("q").unwrap_or_default();
        let mut list = TrackList::new();
        if let Err(e) = list.load(self.library.records()) {
            return ApiError::from(e).into_response();
        }

        let tracks = list
            .listing(Audience::Visitor, &query)
            .into_iter()
            .map(PublicTrack::from_domain)
            .collect::<Vec<_>>();
        Response::json(&tracks)
    }

    fn handle_admin_tracks(&self, request: &Request) -> Response {
        let query = request.get_param("q").unwrap_or_default();

        match self.library.refresh() {
            Ok(_) => Response::json(&self.library.listing(Audience::Admin, &query)),
            Err(e) => ApiError::from(e).into_response(),
        }
    }

    fn create_track(
        &self,
        request: &Request,
    ) -> Result<MutationReport, ApiError> {
        let form = self.read_form(request)?;
        Ok(self.library.create(form)?)
    }

    fn update_track(
        &self,
        id: String,
        request: &Request,
    ) -> Result<MutationReport, ApiError> {
        let id = Self::parse_id(&id)?;
        let form = self.read_form(request)?;
        Ok(self.library.update(id, form)?)
    }

    fn delete_track(&self, id: String) -> Result<MutationReport, ApiError> {
        let id = Self::parse_id(&id)?;
        Ok(self.library.delete(id)?)
    }

    fn parse_id(id: &str) -> Result<TrackId, ApiError> {
        id.parse()
            .map_err(|_| ApiError::BadRequest(format!("invalid track id {id:?}")))
    }

    /// Title and description come from the query string, the blob is the raw body.
    /// An empty body means no blob.
    fn read_form(&self, request: &Request) -> Result<TrackForm, ApiError> {
        let title = request.get_param("title").unwrap_or_default();
        let description = request.get_param("description").unwrap_or_default();

        let mut bytes = Vec::new();
        if let Some(body) = request.data() {
            // one byte over the limit is enough for validation to reject it
            let limit = self.library.policy().max_upload_bytes.saturating_add(1);
            body.take(limit)
                .read_to_end(&mut bytes)
                .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
        }

        let blob = if bytes.is_empty() {
            None
        } else {
            let file_name = request
                .get_param("filename")
                .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());
            Some(Blob::new(file_name, bytes))
        };

        Ok(TrackForm {
            title,
            description,
            blob,
        })
    }

    fn handle_object(&self, bucket: String, key: String) -> Response {
        let objects = self.library.objects();
        if bucket != objects.bucket() {
            return Response::empty_404();
        }

        match objects.open(&key) {
            Ok(Some(file)) => {
                let mime = Self::mime_for_key(&key);
                log::debug!("OBJECT {key} -> 200 OK, MIME type: {mime}");
                Response::from_file(mime, file)
            }
            Ok(None) => ApiError::NotFound(format!("object {key} not found")).into_response(),
            Err(e) => ApiError::from(e).into_response(),
        }
    }

    fn mime_for_key(key: &str) -> String {
        let ext = key
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase());
        let default = || mime_guess::from_path(key).first_or_octet_stream().to_string();
        ext.and_then(|ext| Self::mime_from_ext(ext.as_str()))
            .unwrap_or_else(default)
    }

    /// Map file extension (without dot) to proper MIME type for browser playback.
    /// Returns None if the extension is not recognized.
    pub fn mime_from_ext(ext: &str) -> Option<String> {
        match ext {
            "m4a" => Some("audio/x-m4a".to_string()), // Safari iOS compatible
            "aac" => Some("audio/aac".to_string()),
            "mp3" => Some("audio/mpeg".to_string()),
            "wav" => Some("audio/wav".to_string()),
            "ogg" => Some("audio/ogg".to_string()),
            "flac" => Some("audio/flac".to_string()),
            _ => None,
        }
    }
}

/// Visitor-facing projection, without the storage key
#[derive(Serialize, Deserialize)]
struct PublicTrack {
    id: TrackId,
    title: String,
    description: String,
    public_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl PublicTrack {
    fn from_domain(track: &Track) -> Self {
        Self {
            id: track.id,
            title: track.title.clone(),
            description: track.description.clone(),
            public_url: track.public_url.clone(),
            created_at: track.created_at,
        }
    }
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
