//! Error taxonomy for the reconciliation engine.
//!
//! An unmatched song is not an error; it is reported as
//! [`MatchOutcome::Unavailable`](crate::models::MatchOutcome::Unavailable).
use crate::models::CatalogTag;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A catalog request or response decoding failed.
    #[error("remote fetch failed during {operation}: {source:#}")]
    RemoteFetch {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Pagination did not reach the final page within the iteration ceiling.
    #[error("{operation} did not terminate within {limit} pages")]
    PageLimitExceeded { operation: &'static str, limit: usize },

    /// The target catalog did not hand back a usable playlist id.
    #[error("could not create playlist {name:?}: {reason}")]
    PlaylistCreation { name: String, reason: String },

    /// The playlist id is not in the catalog's playlist listing.
    #[error("{catalog} playlist {id} not found")]
    PlaylistNotFound { catalog: CatalogTag, id: String },
}

impl Error {
    pub fn remote(operation: &'static str, source: anyhow::Error) -> Self {
        Error::RemoteFetch { operation, source }
    }
}
