use crate::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum RequestExecutorError {
    #[error("Request to `{url}` could not be completed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB answered {status} for `{url}`: {error} ({reason})")]
    Server {
        url: String,
        status: u16,
        error: String,
        reason: String,
    },
    #[error("Response from `{url}` is not valid JSON")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unable to build the http client")]
    ClientBuild(#[source] reqwest::Error),
    #[error("RequestExecutor task has been killed")]
    ExecutorGone,
}
impl std::fmt::Debug for RequestExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
