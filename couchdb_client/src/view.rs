use serde_json::Value;
use tracing::instrument;

use crate::{
    couch_command::{CouchCommand, CouchCommandVariant},
    events::{CouchEvent, Notifier},
    resource_path, CouchDbError, ResourceBase, ViewParams,
};

/// One view of a design document.
///
/// Creating a view issues no request. Configure its [`ViewParams`] and call
/// [`View::fetch_data`].
#[derive(Clone, Debug)]
pub struct View {
    base: ResourceBase,
    base_url: String,
    name: String,
    path: String,
    data: Option<Value>,
    params: ViewParams,
}

impl View {
    pub(crate) fn new(
        base: ResourceBase,
        document_path: &str,
        name: &str,
        params: ViewParams,
    ) -> Self {
        Self {
            base,
            base_url: document_path.to_string(),
            name: name.to_string(),
            path: resource_path::view_path(document_path, name),
            data: None,
            params,
        }
    }

    /// Path of the design document this view belongs to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Result of the last successful [`View::fetch_data`].
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn params(&self) -> &ViewParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ViewParams {
        &mut self.params
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        self.base.notifier_mut()
    }

    pub fn set_base_url(&mut self, document_path: &str) {
        self.base_url = document_path.to_string();
        self.path = resource_path::view_path(&self.base_url, &self.name);
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.path = resource_path::view_path(&self.base_url, &self.name);
    }

    pub fn set_params(&mut self, params: ViewParams) {
        self.params = params;
    }

    /// Sets one view parameter from a JSON value. See [`ViewParams::set`].
    pub fn set_param(&mut self, name: &str, value: Value) -> Result<(), CouchDbError> {
        self.params.set(name, value)
    }

    /// GET `{document}/_view/{name}` with the configured parameters.
    #[instrument(
        level = "debug",
        name = "View - Fetch Data",
        skip(self),
        fields(path = %self.path)
    )]
    pub async fn fetch_data(&mut self) -> Result<Value, CouchDbError> {
        let command = CouchCommand::new(
            self.base_url.clone(),
            CouchCommandVariant::QueryView {
                view: self.name.clone(),
                params: self.params.to_query_pairs(),
            },
        );
        let data = self
            .base
            .fetch(command, |response| CouchEvent::Data { response })
            .await?;
        tracing::debug!("View data fetched");
        self.data = Some(data.clone());
        Ok(data)
    }
}
