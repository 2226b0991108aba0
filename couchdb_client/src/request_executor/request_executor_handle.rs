use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

use crate::{couch_command::CouchCommand, ClientConfiguration};

use super::{
    request_executor_actor::run_request_executor_actor, RequestExecutorActor, RequestExecutorError,
    RequestExecutorMessage,
};

/**
This is a handle to the actor that performs HTTP requests.

Cloning this handle is very cheap and will not instantiate a new actor in the background.
When the last handle goes out of scope and is dropped, the backing actor stops once its
in-flight requests finish.

Must be created from within a tokio runtime.
*/
#[derive(Clone, Debug)]
pub struct RequestExecutor {
    sender: mpsc::Sender<RequestExecutorMessage>,
}

impl RequestExecutor {
    pub fn new(configuration: &ClientConfiguration) -> Result<Self, RequestExecutorError> {
        let client = configuration.build_http_client()?;
        let (sender, receiver) = mpsc::channel(8);
        let actor = RequestExecutorActor::new(receiver, client, configuration.credentials.clone());

        tokio::spawn(run_request_executor_actor(actor));

        Ok(Self { sender })
    }

    /// Returns true if both handles talk to the same actor.
    #[cfg(test)]
    pub(crate) fn same_actor(&self, other: &RequestExecutor) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Sends `command` to the server and returns the decoded JSON body.
    #[instrument(
        level = "debug",
        name = "Actor Handle - Execute Couch Command",
        skip(self)
    )]
    pub async fn execute(&self, command: CouchCommand) -> Result<Value, RequestExecutorError> {
        tracing::trace!("Creating oneshot channel");
        let (tx, rx) = oneshot::channel();

        tracing::trace!("Sending message to actor");
        self.sender
            .send(RequestExecutorMessage::ExecuteCouchCommand {
                respond_to: tx,
                command,
            })
            .await
            .map_err(|_| RequestExecutorError::ExecutorGone)?;

        tracing::trace!("Waiting for oneshot to return");
        rx.await.map_err(|_| RequestExecutorError::ExecutorGone)?
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::couch_command::CouchCommandVariant;

    use super::*;

    #[tokio::test]
    async fn execute_returns_decoded_body() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_all_dbs"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["a", "b"])))
            .expect(1)
            .mount(&server)
            .await;
        let executor = RequestExecutor::new(&ClientConfiguration::default()).unwrap();

        // Act
        let result = executor
            .execute(CouchCommand::new(
                server.uri(),
                CouchCommandVariant::GetAllDatabases,
            ))
            .await;

        // Assert
        assert_eq!(result.unwrap(), json!(["a", "b"]));
    }

    #[tokio::test]
    async fn execute_maps_couch_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing/"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"error": "not_found", "reason": "Database does not exist."})),
            )
            .mount(&server)
            .await;
        let executor = RequestExecutor::new(&ClientConfiguration::default()).unwrap();

        let result = executor
            .execute(CouchCommand::new(
                server.uri(),
                CouchCommandVariant::GetDatabaseInfo {
                    database: "missing".into(),
                },
            ))
            .await;

        match result {
            Err(RequestExecutorError::Server {
                status,
                error,
                reason,
                ..
            }) => {
                assert_eq!(status, 404);
                assert_eq!(error, "not_found");
                assert_eq!(reason, "Database does not exist.");
            }
            other => panic!("expected a server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn execute_reports_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;
        let executor = RequestExecutor::new(&ClientConfiguration::default()).unwrap();

        let result = executor
            .execute(CouchCommand::new(
                server.uri(),
                CouchCommandVariant::GetServerInfo,
            ))
            .await;

        assert!(matches!(result, Err(RequestExecutorError::Decode { .. })));
    }

    #[tokio::test]
    async fn execute_reports_unreachable_server() {
        let executor = RequestExecutor::new(&ClientConfiguration::default()).unwrap();

        let result = executor
            .execute(CouchCommand::new(
                "http://127.0.0.1:1",
                CouchCommandVariant::GetServerInfo,
            ))
            .await;

        assert!(matches!(result, Err(RequestExecutorError::Transport { .. })));
    }
}
