use rouille::Response;

use crate::{
    library::error::{ConsistencyError, LibraryError},
    storage::error::StorageError,
};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Validation(e) => ApiError::BadRequest(e.to_string()),

            LibraryError::Consistency(ConsistencyError::NotInList(id)) => {
                ApiError::NotFound(format!("track {id} not found"))
            }

            LibraryError::Consistency(e) => ApiError::Conflict(e.to_string()),

            LibraryError::Busy => ApiError::Conflict(err.to_string()),

            LibraryError::Store { .. } => {
                log::error!("{err}");
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(key) => ApiError::BadRequest(format!("invalid object key {key:?}")),

            StorageError::ObjectExists(_)
            | StorageError::Database(_)
            | StorageError::Fs(_)
            | StorageError::Internal(_) => {
                log::error!("{err}");
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Conflict(_) => 409,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => Response::text(msg).with_status_code(status),
        }
    }
}
