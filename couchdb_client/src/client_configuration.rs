use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::request_executor::RequestExecutorError;

/// HTTP basic auth credentials sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Transport settings shared by a [`Connection`](crate::Connection) and every handle
/// created from it. Each [`RequestExecutor`](crate::request_executor::RequestExecutor)
/// builds its `reqwest::Client` from this.
#[derive(Clone, Debug, Default)]
pub struct ClientConfiguration {
    pub(crate) client_identity: Option<reqwest::Identity>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) default_headers: HeaderMap,
    pub(crate) proxy_address: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

// Getters
impl ClientConfiguration {
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn proxy_address(&self) -> Option<&str> {
        self.proxy_address.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl ClientConfiguration {
    #[tracing::instrument(level = "trace", skip(self))]
    pub(crate) fn build_http_client(&self) -> Result<reqwest::Client, RequestExecutorError> {
        let mut client = reqwest::Client::builder().default_headers(self.default_headers.clone());

        if let Some(identity) = self.client_identity.clone() {
            client = client.identity(identity).use_rustls_tls();
        }

        if let Some(proxy) = &self.proxy_address {
            tracing::trace!("Proxy set to `{}`", proxy);
            let proxy = reqwest::Proxy::all(proxy).map_err(RequestExecutorError::ClientBuild)?;
            client = client.proxy(proxy);
        } else {
            tracing::trace!("No proxy defined. Using system settings.");
        }

        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }

        client.build().map_err(RequestExecutorError::ClientBuild)
    }
}
