//! Commands are the only way this crate talks to the server.
//!
//! Each handle creates a [`CouchCommand`] synchronously from its current fields and
//! passes it to a [`RequestExecutor`](crate::request_executor::RequestExecutor). The
//! command holds everything the request needs:
//! * Base url of the handle issuing it
//! * path to REST endpoint
//! * HTTP Method
//! * query string
//! * Body/payload
use std::collections::BTreeMap;

use reqwest::{header::CONTENT_TYPE, Method};
use serde_json::Value;

use crate::{request_executor::RequestExecutorError, resource_path, Credentials};

/// Caller-supplied query parameters. Key options (`key`, `keys`, `startkey`, `endkey`
/// and their `start_key`/`end_key` spellings) are always sent as JSON text, so a plain
/// string key arrives quoted. Other string values are sent verbatim, every other value
/// as its JSON text, so booleans become `true`/`false`. `null` entries are skipped.
pub type QueryOptions = BTreeMap<String, Value>;

/// Extra members of a `_replicate` request body, such as `continuous` or `create_target`.
pub type ReplicationOptions = serde_json::Map<String, Value>;

#[derive(Clone, Debug)]
pub struct CouchCommand {
    /// Base url of the issuing handle. For views this is the design document path.
    pub base_url: String,
    pub command: CouchCommandVariant,
}

/// Represents all operations that can be sent to the server.
/// Contained inside a [`CouchCommand`]. Holds all data relevant
/// to the specific command to be sent.
#[derive(Clone, Debug)]
pub enum CouchCommandVariant {
    GetServerInfo,
    GetAllDatabases,
    GetUuids {
        count: u32,
    },
    Replicate {
        body: Value,
    },
    CreateDatabase {
        database: String,
    },
    DeleteDatabase {
        database: String,
    },
    GetDatabaseInfo {
        database: String,
    },
    GetAllDocuments {
        database: String,
        options: QueryOptions,
    },
    GetDocument {
        database: String,
        id: String,
        options: QueryOptions,
    },
    PutDocument {
        database: String,
        id: String,
        body: Value,
        options: QueryOptions,
    },
    DeleteDocument {
        database: String,
        id: String,
        options: QueryOptions,
    },
    QueryView {
        view: String,
        params: Vec<(&'static str, String)>,
    },
}

impl CouchCommand {
    pub fn new(base_url: impl Into<String>, command: CouchCommandVariant) -> Self {
        Self {
            base_url: base_url.into(),
            command,
        }
    }

    pub fn method(&self) -> Method {
        match &self.command {
            CouchCommandVariant::Replicate { .. } => Method::POST,
            CouchCommandVariant::CreateDatabase { .. }
            | CouchCommandVariant::PutDocument { .. } => Method::PUT,
            CouchCommandVariant::DeleteDatabase { .. }
            | CouchCommandVariant::DeleteDocument { .. } => Method::DELETE,
            _ => Method::GET,
        }
    }

    /// Full url of the request, without the query string.
    pub fn url(&self) -> String {
        let base = self.base_url.as_str();
        match &self.command {
            CouchCommandVariant::GetServerInfo => resource_path::server_path(base),
            CouchCommandVariant::GetAllDatabases => {
                resource_path::server_endpoint_path(base, "_all_dbs")
            }
            CouchCommandVariant::GetUuids { .. } => {
                resource_path::server_endpoint_path(base, "_uuids")
            }
            CouchCommandVariant::Replicate { .. } => {
                resource_path::server_endpoint_path(base, "_replicate")
            }
            CouchCommandVariant::CreateDatabase { database }
            | CouchCommandVariant::DeleteDatabase { database }
            | CouchCommandVariant::GetDatabaseInfo { database } => {
                resource_path::database_path(base, database)
            }
            CouchCommandVariant::GetAllDocuments { database, .. } => {
                resource_path::all_documents_path(base, database)
            }
            CouchCommandVariant::GetDocument { database, id, .. }
            | CouchCommandVariant::PutDocument { database, id, .. }
            | CouchCommandVariant::DeleteDocument { database, id, .. } => {
                resource_path::document_path(base, database, id)
            }
            CouchCommandVariant::QueryView { view, .. } => resource_path::view_path(base, view),
        }
    }

    /// Query string pairs, in the order they will be serialized.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match &self.command {
            CouchCommandVariant::GetUuids { count } => vec![("count".into(), count.to_string())],
            CouchCommandVariant::GetAllDocuments { options, .. }
            | CouchCommandVariant::GetDocument { options, .. }
            | CouchCommandVariant::PutDocument { options, .. }
            | CouchCommandVariant::DeleteDocument { options, .. } => options_to_pairs(options),
            CouchCommandVariant::QueryView { params, .. } => params
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match &self.command {
            CouchCommandVariant::Replicate { body }
            | CouchCommandVariant::PutDocument { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns a [`reqwest::Request`] for the specific [`CouchCommandVariant`].
    pub fn get_http_request(
        &self,
        client: &reqwest::Client,
        credentials: Option<&Credentials>,
    ) -> Result<reqwest::Request, RequestExecutorError> {
        let url = self.url();

        let mut builder = client
            .request(self.method(), url.as_str())
            .header(CONTENT_TYPE, "application/json");

        let query = self.query_pairs();
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = self.body() {
            builder = builder.json(body);
        }
        if let Some(credentials) = credentials {
            builder = builder.basic_auth(credentials.username(), Some(credentials.password()));
        }

        builder
            .build()
            .map_err(|source| RequestExecutorError::Transport { url, source })
    }
}

fn options_to_pairs(options: &QueryOptions) -> Vec<(String, String)> {
    options
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| {
            let text = if JSON_KEY_OPTIONS.contains(&name.as_str()) {
                value.to_string()
            } else {
                query_value(value)
            };
            (name.clone(), text)
        })
        .collect()
}

/// Options CouchDB parses as JSON.
const JSON_KEY_OPTIONS: [&str; 6] = ["key", "keys", "startkey", "endkey", "start_key", "end_key"];

pub(crate) fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use serde_json::json;

    use super::*;

    #[test]
    fn get_http_request_serializes_options_as_query() {
        // Arrange
        let mut options = QueryOptions::new();
        options.insert("include_docs".into(), json!(true));
        options.insert("limit".into(), json!(10));
        options.insert("startkey_docid".into(), json!("a b"));
        options.insert("skipped".into(), Value::Null);
        let command = CouchCommand::new(
            "http://localhost:5984",
            CouchCommandVariant::GetAllDocuments {
                database: "inventory".into(),
                options,
            },
        );

        // Act
        let request = command
            .get_http_request(&reqwest::Client::new(), None)
            .unwrap();

        // Assert
        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "http://localhost:5984/inventory/_all_docs?include_docs=true&limit=10&startkey_docid=a+b"
        );
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn key_options_are_json_encoded() {
        let mut options = QueryOptions::new();
        options.insert("startkey".into(), json!("apple"));
        options.insert("endkey".into(), json!(["apple", {}]));
        options.insert("rev".into(), json!("1-abc"));
        let command = CouchCommand::new(
            "http://h",
            CouchCommandVariant::GetAllDocuments {
                database: "d".into(),
                options,
            },
        );

        let pairs = command.query_pairs();

        assert_eq!(
            pairs,
            vec![
                ("endkey".to_string(), r#"["apple",{}]"#.to_string()),
                ("rev".to_string(), "1-abc".to_string()),
                ("startkey".to_string(), r#""apple""#.to_string()),
            ]
        );
    }

    #[test]
    fn get_http_request_for_PutDocument_carries_json_body() {
        let command = CouchCommand::new(
            "http://localhost:5984",
            CouchCommandVariant::PutDocument {
                database: "inventory".into(),
                id: "widget-1".into(),
                body: json!({"_id": "widget-1", "count": 3}),
                options: QueryOptions::new(),
            },
        );

        let request = command
            .get_http_request(&reqwest::Client::new(), None)
            .unwrap();

        assert_eq!(request.method(), Method::PUT);
        assert_eq!(
            request.url().as_str(),
            "http://localhost:5984/inventory/widget-1"
        );
        let body: Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body, json!({"_id": "widget-1", "count": 3}));
    }

    #[test]
    fn get_http_request_applies_basic_auth() {
        let command =
            CouchCommand::new("http://localhost:5984", CouchCommandVariant::GetServerInfo);
        let credentials = Credentials::new("admin", "secret");

        let request = command
            .get_http_request(&reqwest::Client::new(), Some(&credentials))
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:5984/");
        assert!(request
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("Basic "));
    }

    #[test]
    fn method_matches_command() {
        let base = "http://h";
        let cases = [
            (CouchCommandVariant::GetAllDatabases, Method::GET),
            (CouchCommandVariant::Replicate { body: json!({}) }, Method::POST),
            (
                CouchCommandVariant::CreateDatabase {
                    database: "d".into(),
                },
                Method::PUT,
            ),
            (
                CouchCommandVariant::DeleteDocument {
                    database: "d".into(),
                    id: "1".into(),
                    options: QueryOptions::new(),
                },
                Method::DELETE,
            ),
        ];
        for (variant, method) in cases {
            assert_eq!(CouchCommand::new(base, variant).method(), method);
        }
    }
}
