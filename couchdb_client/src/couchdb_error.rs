use crate::{error_chain_fmt, request_executor::RequestExecutorError};

#[derive(thiserror::Error)]
pub enum CouchDbError {
    #[error(transparent)]
    Request(#[from] RequestExecutorError),
    #[error("Document data has no `_id`, refusing to save")]
    MissingDocumentId,
    #[error("Document `{0}` has no view definitions in its info")]
    MissingViews(String),
    #[error("Replication {0} must be a non-empty database name or url")]
    InvalidReplicationEndpoint(&'static str),
    #[error("Invalid value for view parameter `{name}`: {reason}")]
    InvalidViewParameter { name: String, reason: String },
    #[error("Invalid CouchDB url `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Url `{0}` does not have the correct scheme")]
    InvalidScheme(String),
    #[error("No url was supplied and a connection can't exist without one")]
    MissingUrl,
    #[error("Invalid client certificate. Caused by: {0}")]
    Certificate(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for CouchDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
