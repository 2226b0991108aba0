use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::{
    couch_command::CouchCommand,
    events::{CouchEvent, Notifier},
    request_executor::RequestExecutor,
    ClientConfiguration, CouchDbError,
};

/// State shared by every handle: configuration, transport and notifier.
#[derive(Clone, Debug, Default)]
pub struct ResourceBase {
    configuration: Arc<ClientConfiguration>,
    default_executor: OnceLock<RequestExecutor>,
    notifier: Notifier,
}

impl ResourceBase {
    pub(crate) fn new(configuration: Arc<ClientConfiguration>, notifier: Notifier) -> Self {
        Self {
            configuration,
            default_executor: OnceLock::new(),
            notifier,
        }
    }

    /// Base for a child handle. Shares configuration and a copy of the notifier,
    /// but gets its own default executor.
    pub(crate) fn child(&self) -> Self {
        Self::new(self.configuration.clone(), self.notifier.clone())
    }

    pub fn configuration(&self) -> &ClientConfiguration {
        &self.configuration
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    /// Returns the transport for one request.
    ///
    /// With `force_new` a fresh executor is built for this request only. Otherwise the
    /// handle's default executor is returned, created from the current configuration
    /// on first use.
    pub fn executor(&self, force_new: bool) -> Result<RequestExecutor, CouchDbError> {
        if force_new {
            return Ok(RequestExecutor::new(&self.configuration)?);
        }
        if let Some(executor) = self.default_executor.get() {
            return Ok(executor.clone());
        }
        let executor = RequestExecutor::new(&self.configuration)?;
        Ok(self.default_executor.get_or_init(|| executor).clone())
    }

    /// Runs `command` and fires an `Error` notification if it fails.
    pub(crate) async fn execute(
        &self,
        command: CouchCommand,
        force_new: bool,
    ) -> Result<Value, CouchDbError> {
        let description = format!("{} {}", command.method(), command.url());
        let result = match self.executor(force_new) {
            Ok(executor) => executor.execute(command).await.map_err(CouchDbError::from),
            Err(e) => Err(e),
        };
        result.map_err(|e| {
            self.notifier
                .error(format!("Request `{}` failed. Caused by: {}", description, e));
            e
        })
    }

    /// Runs `command` on a fresh executor and publishes the response as `event`.
    pub(crate) async fn fetch(
        &self,
        command: CouchCommand,
        event: fn(Value) -> CouchEvent,
    ) -> Result<Value, CouchDbError> {
        self.fetch_with(command, true, event).await
    }

    pub(crate) async fn fetch_with(
        &self,
        command: CouchCommand,
        force_new: bool,
        event: fn(Value) -> CouchEvent,
    ) -> Result<Value, CouchDbError> {
        let response = self.execute(command, force_new).await?;
        self.notifier.notify(event(response.clone()));
        Ok(response)
    }

    /// Fires an `Error` notification and hands the error back.
    pub(crate) fn fail(&self, error: CouchDbError) -> CouchDbError {
        self.notifier.error(error.to_string());
        error
    }
}
