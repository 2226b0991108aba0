use serde_json::Value;
use tracing::instrument;

use crate::{
    couch_command::{CouchCommand, CouchCommandVariant, QueryOptions},
    events::{CouchEvent, Notifier},
    resource_path, CouchDbError, ResourceBase, View, ViewParams,
};

/// One document of a database.
///
/// `data` holds the document body: the result of [`Document::open`], or whatever the
/// caller set before [`Document::save`]. `info` holds the result of
/// [`Document::fetch_info`]; for design documents that is where `views` live.
#[derive(Clone, Debug)]
pub struct Document {
    base: ResourceBase,
    base_url: String,
    database_name: String,
    /// Percent-encoded.
    id: String,
    path: String,
    info: Option<Value>,
    data: Value,
}

impl Document {
    pub(crate) fn new(base: ResourceBase, base_url: &str, database_name: &str, id: &str) -> Self {
        let id = resource_path::encode_document_id(id);
        Self {
            base,
            base_url: base_url.to_string(),
            database_name: database_name.to_string(),
            path: resource_path::document_path(base_url, database_name, &id),
            id,
            info: None,
            data: Value::Object(Default::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// The document id as it appears in the url.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn info(&self) -> Option<&Value> {
        self.info.as_ref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Value {
        &mut self.data
    }

    pub fn set_data(&mut self, data: Value) {
        self.data = data;
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        self.base.notifier_mut()
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.to_string();
        self.refresh_path();
    }

    pub fn set_database_name(&mut self, database_name: &str) {
        self.database_name = database_name.to_string();
        self.refresh_path();
    }

    pub fn set_id(&mut self, id: &str) {
        self.id = resource_path::encode_document_id(id);
        self.refresh_path();
    }

    fn refresh_path(&mut self) {
        self.path = resource_path::document_path(&self.base_url, &self.database_name, &self.id);
    }

    fn command(&self, command: CouchCommandVariant) -> CouchCommand {
        CouchCommand::new(self.base_url.clone(), command)
    }

    /// GET the document and keep the response as `info`.
    #[instrument(
        level = "debug",
        name = "Document - Fetch Info",
        skip(self),
        fields(path = %self.path)
    )]
    pub async fn fetch_info(&mut self) -> Result<Value, CouchDbError> {
        let command = self.command(CouchCommandVariant::GetDocument {
            database: self.database_name.clone(),
            id: self.id.clone(),
            options: QueryOptions::new(),
        });
        let info = self
            .base
            .fetch(command, |response| CouchEvent::Info { response })
            .await?;
        self.info = Some(info.clone());
        Ok(info)
    }

    /// GET the document with `options` (for example `rev` or `revs_info`) and keep
    /// the body as `data`.
    #[instrument(level = "debug", name = "Document - Open", skip(self), fields(path = %self.path))]
    pub async fn open(&mut self, options: &QueryOptions) -> Result<Value, CouchDbError> {
        let command = self.command(CouchCommandVariant::GetDocument {
            database: self.database_name.clone(),
            id: self.id.clone(),
            options: options.clone(),
        });
        let data = self
            .base
            .fetch(command, |response| CouchEvent::Opened { response })
            .await?;
        self.data = data.clone();
        Ok(data)
    }

    /// PUT `data` under the id found in `data._id`.
    ///
    /// Nothing is sent when `data` has no `_id`. On success the new revision is written
    /// back into `data._rev`.
    #[instrument(level = "debug", name = "Document - Save", skip(self), fields(path = %self.path))]
    pub async fn save(&mut self, options: &QueryOptions) -> Result<Value, CouchDbError> {
        let doc_id = match self.data.get("_id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => resource_path::encode_document_id(id),
            _ => return Err(self.base.fail(CouchDbError::MissingDocumentId)),
        };

        let command = self.command(CouchCommandVariant::PutDocument {
            database: self.database_name.clone(),
            id: doc_id,
            body: self.data.clone(),
            options: options.clone(),
        });
        let response = self
            .base
            .fetch(command, |response| CouchEvent::Saved { response })
            .await?;

        if let (Some(rev), Some(data)) = (response.get("rev"), self.data.as_object_mut()) {
            data.insert("_rev".to_string(), rev.clone());
        }
        Ok(response)
    }

    /// DELETE the document. `rev` is taken from `data._rev` unless `options` has one.
    #[instrument(
        level = "debug",
        name = "Document - Remove",
        skip(self),
        fields(path = %self.path)
    )]
    pub async fn remove(&mut self, options: &QueryOptions) -> Result<Value, CouchDbError> {
        let mut options = options.clone();
        if !options.contains_key("rev") {
            if let Some(rev) = self.data.get("_rev").filter(|rev| rev.is_string()) {
                options.insert("rev".to_string(), rev.clone());
            }
        }

        let command = self.command(CouchCommandVariant::DeleteDocument {
            database: self.database_name.clone(),
            id: self.id.clone(),
            options,
        });
        self.base
            .fetch(command, |response| CouchEvent::Deleted { response })
            .await
    }

    /// Names of the views defined in `info.views`.
    ///
    /// Fires an `Error` notification and returns nothing if the info has not been
    /// fetched or defines no views.
    pub fn all_views(&self) -> Vec<String> {
        match self
            .info
            .as_ref()
            .and_then(|info| info.get("views"))
            .and_then(Value::as_object)
        {
            Some(views) => views.keys().cloned().collect(),
            None => {
                self.base.fail(CouchDbError::MissingViews(self.id.clone()));
                Vec::new()
            }
        }
    }

    /// Returns a handle to view `name` of this design document. No request is made.
    pub fn view(&self, name: &str, params: ViewParams) -> View {
        View::new(self.base.child(), &self.path, name, params)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::test_support::recording_notifier;

    use super::*;

    fn document(
        base_url: &str,
        id: &str,
    ) -> (Document, std::sync::Arc<std::sync::Mutex<Vec<CouchEvent>>>) {
        let (notifier, seen) = recording_notifier();
        let base = ResourceBase::new(Default::default(), notifier);
        (Document::new(base, base_url, "inventory", id), seen)
    }

    #[test]
    fn path_is_recomputed_on_every_change() {
        let (mut document, _) = document("http://h", "a b");
        assert_eq!(document.path(), "http://h/inventory/a%20b");

        document.set_id("_design/app");
        document.set_database_name("other");
        document.set_base_url("http://k");

        assert_eq!(document.path(), "http://k/other/_design%2Fapp");
    }

    #[tokio::test]
    async fn save_without_id_fires_error_and_sends_nothing() {
        // Arrange
        let server = MockServer::start().await;
        let (mut document, seen) = document(&server.uri(), "1");
        document.set_data(json!({}));

        // Act
        let result = document.save(&QueryOptions::new()).await;

        // Assert
        assert!(matches!(result, Err(CouchDbError::MissingDocumentId)));
        assert!(server.received_requests().await.unwrap().is_empty());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], CouchEvent::Error { .. }));
    }

    #[tokio::test]
    async fn save_puts_data_under_its_id_and_keeps_new_rev() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/inventory/widget%2F1"))
            .and(query_param("batch", "ok"))
            .and(body_json(json!({"_id": "widget/1", "count": 3})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"ok": true, "id": "widget/1", "rev": "1-abc"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let (mut document, seen) = document(&server.uri(), "widget/1");
        document.set_data(json!({"_id": "widget/1", "count": 3}));
        let mut options = QueryOptions::new();
        options.insert("batch".into(), json!("ok"));

        let response = document.save(&options).await.unwrap();

        assert_eq!(response["rev"], "1-abc");
        assert_eq!(document.data()["_rev"], "1-abc");
        assert!(matches!(seen.lock().unwrap()[0], CouchEvent::Saved { .. }));
    }

    #[tokio::test]
    async fn remove_sends_known_rev() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/inventory/widget-1"))
            .and(query_param("rev", "2-def"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "id": "widget-1", "rev": "3-fff"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let (mut document, seen) = document(&server.uri(), "widget-1");
        document.set_data(json!({"_id": "widget-1", "_rev": "2-def"}));

        let response = document.remove(&QueryOptions::new()).await.unwrap();

        assert_eq!(response["ok"], true);
        assert!(matches!(seen.lock().unwrap()[0], CouchEvent::Deleted { .. }));
    }

    #[tokio::test]
    async fn remove_conflict_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"error": "conflict", "reason": "Document update conflict."})),
            )
            .mount(&server)
            .await;
        let (mut document, seen) = document(&server.uri(), "widget-1");

        let result = document.remove(&QueryOptions::new()).await;

        assert!(result.is_err());
        assert!(matches!(seen.lock().unwrap()[0], CouchEvent::Error { .. }));
    }

    #[test]
    fn all_views_without_info_is_empty_and_fires_error() {
        let (document, seen) = document("http://h", "_design/app");

        let views = document.all_views();

        assert!(views.is_empty());
        assert!(matches!(seen.lock().unwrap()[0], CouchEvent::Error { .. }));
    }

    #[tokio::test]
    async fn fetch_info_then_all_views_lists_view_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/inventory/_design%2Fapp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_id": "_design/app",
                "views": {"by_date": {"map": "function(doc){}"}, "by_name": {"map": "function(doc){}"}}
            })))
            .mount(&server)
            .await;
        let (mut document, seen) = document(&server.uri(), "_design/app");

        document.fetch_info().await.unwrap();
        let views = document.all_views();

        assert_eq!(views, vec!["by_date".to_string(), "by_name".to_string()]);
        assert!(matches!(seen.lock().unwrap()[0], CouchEvent::Info { .. }));
    }

    #[test]
    fn view_is_scoped_to_the_document() {
        let (document, _) = document("http://h", "_design/app");

        let view = document.view("by_name", ViewParams::default());

        assert_eq!(view.base_url(), "http://h/inventory/_design%2Fapp");
        assert_eq!(view.path(), "http://h/inventory/_design%2Fapp/_view/by_name");
    }
}
