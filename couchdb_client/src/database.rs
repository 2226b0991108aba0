use serde_json::Value;
use tracing::instrument;

use crate::{
    couch_command::{CouchCommand, CouchCommandVariant, QueryOptions},
    events::{CouchEvent, Notifier},
    resource_path, CouchDbError, Document, ResourceBase,
};

/// One database on a CouchDB server.
#[derive(Clone, Debug)]
pub struct Database {
    base: ResourceBase,
    base_url: String,
    name: String,
    path: String,
    info: Option<Value>,
    documents: Option<Value>,
}

impl Database {
    pub(crate) fn new(base: ResourceBase, base_url: &str, name: &str) -> Self {
        Self {
            base,
            base_url: base_url.to_string(),
            name: name.to_string(),
            path: resource_path::database_path(base_url, name),
            info: None,
            documents: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `{base_url}/{name}/`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn info(&self) -> Option<&Value> {
        self.info.as_ref()
    }

    /// Result of the last successful [`Database::fetch_all_documents`].
    pub fn documents(&self) -> Option<&Value> {
        self.documents.as_ref()
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        self.base.notifier_mut()
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.to_string();
        self.path = resource_path::database_path(&self.base_url, &self.name);
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.path = resource_path::database_path(&self.base_url, &self.name);
    }

    #[instrument(
        level = "debug",
        name = "Database - Fetch Info",
        skip(self),
        fields(path = %self.path)
    )]
    pub async fn fetch_info(&mut self) -> Result<Value, CouchDbError> {
        let command = CouchCommand::new(
            self.base_url.clone(),
            CouchCommandVariant::GetDatabaseInfo {
                database: self.name.clone(),
            },
        );
        let info = self
            .base
            .fetch(command, |response| CouchEvent::Info { response })
            .await?;
        self.info = Some(info.clone());
        Ok(info)
    }

    /// GET `_all_docs` with `options` as query, for example `include_docs` or `limit`.
    #[instrument(
        level = "debug",
        name = "Database - Fetch All Documents",
        skip(self),
        fields(path = %self.path)
    )]
    pub async fn fetch_all_documents(
        &mut self,
        options: &QueryOptions,
    ) -> Result<Value, CouchDbError> {
        let command = CouchCommand::new(
            self.base_url.clone(),
            CouchCommandVariant::GetAllDocuments {
                database: self.name.clone(),
                options: options.clone(),
            },
        );
        let documents = self
            .base
            .fetch(command, |response| CouchEvent::FetchAll { response })
            .await?;
        tracing::debug!("All documents listing downloaded");
        self.documents = Some(documents.clone());
        Ok(documents)
    }

    /// Returns a handle to document `id`. No request is made.
    pub fn document(&self, id: &str) -> Document {
        Document::new(self.base.child(), &self.base_url, &self.name, id)
    }
}
