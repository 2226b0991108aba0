use std::{fs::File, io::Read, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Url,
};
use tracing::instrument;

use crate::{ClientConfiguration, Connection, CouchDbError, Credentials};

pub const URL_ENV_VAR: &str = "COUCHDB_URL";
pub const USER_ENV_VAR: &str = "COUCHDB_USER";
pub const PASSWORD_ENV_VAR: &str = "COUCHDB_PASSWORD";

#[derive(Debug, Default)]
pub struct ConnectionBuilder {
    client_certificate_path: Option<String>,
    credentials: Option<Credentials>,
    headers: Vec<(String, String)>,
    proxy_address: Option<String>,
    timeout: Option<Duration>,
    url: Option<String>,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from `COUCHDB_URL`, `COUCHDB_USER` and `COUCHDB_PASSWORD` when they are set.
    pub fn from_env() -> Self {
        let mut builder = Self::default();
        if let Ok(url) = std::env::var(URL_ENV_VAR) {
            builder = builder.set_url(&url);
        }
        if let (Ok(user), Ok(password)) = (
            std::env::var(USER_ENV_VAR),
            std::env::var(PASSWORD_ENV_VAR),
        ) {
            builder = builder.set_credentials(&user, &password);
        }
        builder
    }

    pub fn set_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn set_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn set_client_certificate(mut self, certificate_path: &str) -> Self {
        self.client_certificate_path = Some(certificate_path.to_string());
        self
    }

    pub fn set_proxy_address(mut self, proxy_address: &str) -> Self {
        self.proxy_address = Some(proxy_address.to_string());
        self
    }

    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a header sent with every request.
    pub fn set_header(mut self, name: &str, value: &str) -> Self {
        tracing::trace!("Adding default header `{}`", name);
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Validates the configuration and returns a [`Connection`].
    ///
    /// No request is made. This function can be called more than once so the builder
    /// can act as a template after being set up once.
    #[instrument(level = "debug", name = "Build ConnectionBuilder", skip(self))]
    pub fn build(&self) -> Result<Connection, CouchDbError> {
        let url = match &self.url {
            Some(url) => url,
            None => {
                tracing::error!("No url was supplied and a connection can't exist without one");
                return Err(CouchDbError::MissingUrl);
            }
        };

        let url = validate_url(url, self.client_certificate_path.is_some())?;

        let client_identity = match &self.client_certificate_path {
            Some(certpath) => Some(load_identity(certpath)?),
            None => None,
        };

        let configuration = ClientConfiguration {
            client_identity,
            credentials: self.credentials.clone(),
            default_headers: build_headers(&self.headers)?,
            proxy_address: self.proxy_address.clone(),
            timeout: self.timeout,
        };

        tracing::trace!("Client configuration: {:?}", &configuration);

        Ok(Connection::with_configuration(url.as_str(), configuration))
    }
}

/// Parses `url`, ensuring it is http or https, and https when a client certificate is used.
#[instrument(level = "debug", name = "Validate URL")]
fn validate_url(url: &str, require_https: bool) -> Result<Url, CouchDbError> {
    let parsed = Url::parse(url).map_err(|source| CouchDbError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    let scheme_ok = match parsed.scheme() {
        "https" => true,
        "http" => !require_https,
        _ => false,
    };
    if !scheme_ok {
        tracing::error!("Url does not have correct scheme: {}", parsed);
        return Err(CouchDbError::InvalidScheme(parsed.to_string()));
    }

    Ok(parsed)
}

/// Opens and validates a PEM certificate, and creates an identity from it.
fn load_identity(certpath: &str) -> Result<reqwest::Identity, CouchDbError> {
    let mut buf = Vec::new();
    File::open(certpath)
        .map_err(|e| {
            let err = CouchDbError::Certificate(format!("failed to open `{}`: {}", certpath, e));
            tracing::error!("{}", &err);
            err
        })?
        .read_to_end(&mut buf)
        .map_err(|e| {
            let err = CouchDbError::Certificate(format!(
                "`{}` was opened but unable to read: {}",
                certpath, e
            ));
            tracing::error!("{}", &err);
            err
        })?;
    reqwest::Identity::from_pem(&buf).map_err(|e| {
        let err = CouchDbError::Certificate(format!("invalid pem file: {}", e));
        tracing::error!("{}", &err);
        err
    })
}

fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap, CouchDbError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid header name `{}`. Caused by: {}", name, e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| anyhow::anyhow!("Invalid value for header `{}`. Caused by: {}", name, e))?;
        map.append(name, value);
    }
    Ok(map)
}
