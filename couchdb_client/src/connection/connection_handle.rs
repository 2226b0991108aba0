use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use crate::{
    couch_command::{CouchCommand, CouchCommandVariant, ReplicationOptions},
    events::{CouchEvent, Notifier},
    resource_path, ClientConfiguration, ConnectionBuilder, CouchDbError, Database, ResourceBase,
};

/**
A handle to one CouchDB server.

Creating a connection makes no request. Call [`Connection::fetch_info`] to check the
server is reachable. Databases are reached through [`Connection::database`], and every
handle created from it shares this connection's configuration and a copy of its
notifier.

```rust,no_run
# tokio_test::block_on(async {
use couchdb_client::Connection;

let mut connection = Connection::new("http://localhost:5984/");
let info = connection.fetch_info(true).await?;
println!("CouchDB {}", info["version"]);
# Ok::<(), couchdb_client::CouchDbError>(())
# });
```
*/
#[derive(Clone, Debug)]
pub struct Connection {
    base: ResourceBase,
    base_url: String,
    databases: Vec<String>,
    info: Option<Value>,
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::default()
    }

    /// A connection with default configuration. The url is not validated; use
    /// [`Connection::builder`] for that.
    pub fn new(base_url: &str) -> Self {
        Self::with_configuration(base_url, ClientConfiguration::default())
    }

    pub(crate) fn with_configuration(base_url: &str, configuration: ClientConfiguration) -> Self {
        Self {
            base: ResourceBase::new(Arc::new(configuration), Notifier::default()),
            base_url: resource_path::normalize_base_url(base_url),
            databases: Vec::new(),
            info: None,
        }
    }

    /// Server url without its trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = resource_path::normalize_base_url(base_url);
    }

    pub fn configuration(&self) -> &ClientConfiguration {
        self.base.configuration()
    }

    /// Result of the last successful [`Connection::fetch_info`].
    pub fn info(&self) -> Option<&Value> {
        self.info.as_ref()
    }

    /// Result of the last successful [`Connection::fetch_all_databases`].
    pub fn databases(&self) -> &[String] {
        &self.databases
    }

    pub fn notifier(&self) -> &Notifier {
        self.base.notifier()
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        self.base.notifier_mut()
    }

    fn command(&self, command: CouchCommandVariant) -> CouchCommand {
        CouchCommand::new(self.base_url.clone(), command)
    }

    /// GET `{base_url}/`.
    ///
    /// With `force_new` the request gets its own executor, otherwise the connection's
    /// default executor is reused.
    #[instrument(
        level = "debug",
        name = "Connection - Fetch Info",
        skip(self),
        fields(base_url = %self.base_url)
    )]
    pub async fn fetch_info(&mut self, force_new: bool) -> Result<Value, CouchDbError> {
        let command = self.command(CouchCommandVariant::GetServerInfo);
        let info = self
            .base
            .fetch_with(command, force_new, |response| CouchEvent::Info { response })
            .await?;
        tracing::info!("Server info downloaded");
        self.info = Some(info.clone());
        Ok(info)
    }

    /// GET `{base_url}/_all_dbs`.
    #[instrument(
        level = "debug",
        name = "Connection - Fetch All Databases",
        skip(self),
        fields(base_url = %self.base_url)
    )]
    pub async fn fetch_all_databases(
        &mut self,
        force_new: bool,
    ) -> Result<Vec<String>, CouchDbError> {
        let command = self.command(CouchCommandVariant::GetAllDatabases);
        let response = self.base.execute(command, force_new).await?;
        let databases = serde_json::from_value::<Vec<String>>(response.clone()).map_err(|e| {
            self.base.fail(CouchDbError::UnexpectedError(anyhow::anyhow!(
                "Unable to read the database list. Caused by: {}",
                e
            )))
        })?;
        // Only a list that decoded is published
        self.base.notifier().notify(CouchEvent::FetchAll { response });
        self.databases = databases.clone();
        Ok(databases)
    }

    /// Returns a handle to database `name`. No request is made.
    pub fn database(&self, name: &str) -> Database {
        Database::new(self.base.child(), &self.base_url, name)
    }

    /// POST `{base_url}/_replicate` with body `{..options, source, target}`.
    ///
    /// Empty `source` or `target` is rejected before anything is sent.
    #[instrument(level = "debug", name = "Connection - Replicate", skip(self, options))]
    pub async fn replicate(
        &self,
        source: &str,
        target: &str,
        options: ReplicationOptions,
    ) -> Result<Value, CouchDbError> {
        if source.trim().is_empty() {
            return Err(self.base.fail(CouchDbError::InvalidReplicationEndpoint("source")));
        }
        if target.trim().is_empty() {
            return Err(self.base.fail(CouchDbError::InvalidReplicationEndpoint("target")));
        }

        let mut body = options;
        body.insert("source".to_string(), Value::String(source.to_string()));
        body.insert("target".to_string(), Value::String(target.to_string()));

        let command = self.command(CouchCommandVariant::Replicate {
            body: Value::Object(body),
        });
        self.base
            .fetch(command, |response| CouchEvent::Replicated { response })
            .await
    }

    /// PUT `{base_url}/{name}/` and return a handle to the new database.
    #[instrument(level = "debug", name = "Connection - Create Database", skip(self))]
    pub async fn create_database(&self, name: &str) -> Result<Database, CouchDbError> {
        let command = self.command(CouchCommandVariant::CreateDatabase {
            database: name.to_string(),
        });
        self.base
            .fetch(command, |response| CouchEvent::Created { response })
            .await?;
        Ok(self.database(name))
    }

    /// DELETE `{base_url}/{name}/`.
    #[instrument(level = "debug", name = "Connection - Delete Database", skip(self))]
    pub async fn delete_database(&self, name: &str) -> Result<Value, CouchDbError> {
        let command = self.command(CouchCommandVariant::DeleteDatabase {
            database: name.to_string(),
        });
        self.base
            .fetch(command, |response| CouchEvent::Deleted { response })
            .await
    }

    /// GET `{base_url}/_uuids?count={count}`.
    #[instrument(level = "debug", name = "Connection - Fetch UUIDs", skip(self))]
    pub async fn fetch_uuids(&self, count: u32) -> Result<Vec<String>, CouchDbError> {
        let command = self.command(CouchCommandVariant::GetUuids { count });
        let response = self.base.execute(command, true).await?;
        let uuids = response
            .get("uuids")
            .cloned()
            .map(serde_json::from_value::<Vec<String>>)
            .and_then(Result::ok)
            .ok_or_else(|| {
                self.base.fail(CouchDbError::UnexpectedError(anyhow::anyhow!(
                    "Server response has no `uuids` list"
                )))
            })?;
        Ok(uuids)
    }
}
