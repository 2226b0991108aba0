use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{instrument, Instrument, Span};
use uuid::Uuid;

use crate::{couch_command::CouchCommand, Credentials};

use super::{RequestExecutorError, RequestExecutorMessage};

pub struct RequestExecutorActor {
    credentials: Option<Credentials>,
    receiver: mpsc::Receiver<RequestExecutorMessage>,
    /// Reqwest client maintains an internal connection pool. It is reused for as long
    /// as this actor lives.
    reqwest_client: reqwest::Client,
}

impl RequestExecutorActor {
    pub(crate) fn new(
        receiver: mpsc::Receiver<RequestExecutorMessage>,
        reqwest_client: reqwest::Client,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            credentials,
            receiver,
            reqwest_client,
        }
    }

    /// Message handler for the RequestExecutorActor
    #[instrument(
        level = "debug",
        name = "RequestExecutor Actor - Handle Message",
        skip(self, msg),
        fields(correlation_id)
    )]
    async fn handle_message(&self, msg: RequestExecutorMessage) {
        // Apply a correlation id to all child spans of this message handler
        Span::current().record(
            "correlation_id",
            tracing::field::display(Uuid::new_v4()),
        );
        match msg {
            RequestExecutorMessage::ExecuteCouchCommand {
                respond_to,
                command,
            } => {
                let client = self.reqwest_client.clone();
                let credentials = self.credentials.clone();

                // Spawn a task to do the request so a slow response never blocks the actor
                tokio::spawn(
                    async move {
                        let result =
                            send_couch_command_to_server(&client, credentials.as_ref(), command)
                                .await;
                        // Send the result back to the caller
                        let _ = respond_to.send(result);
                    }
                    .instrument(Span::current()),
                );
            }
        }
    }
}

/// Body CouchDB sends along with every non-2xx status.
#[derive(Debug, Default, Deserialize)]
struct CouchErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: String,
}

#[instrument(level = "debug", skip(client, credentials))]
async fn send_couch_command_to_server(
    client: &reqwest::Client,
    credentials: Option<&Credentials>,
    command: CouchCommand,
) -> Result<Value, RequestExecutorError> {
    let request = command.get_http_request(client, credentials)?;
    let url = request.url().to_string();
    tracing::trace!("{} {}", request.method(), &url);

    let response = client
        .execute(request)
        .await
        .map_err(|source| RequestExecutorError::Transport {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    tracing::debug!("Server answered {}", status);
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let couch_error = serde_json::from_str::<CouchErrorBody>(&body).unwrap_or_else(|_| {
            CouchErrorBody {
                error: status
                    .canonical_reason()
                    .unwrap_or("unknown")
                    .to_lowercase(),
                reason: body,
            }
        });
        return Err(RequestExecutorError::Server {
            url,
            status: status.as_u16(),
            error: couch_error.error,
            reason: couch_error.reason,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|source| RequestExecutorError::Decode { url, source })
}

#[instrument(level = "debug", name = "Running RequestExecutor Actor", skip(actor))]
pub async fn run_request_executor_actor(mut actor: RequestExecutorActor) {
    while let Some(msg) = actor.receiver.recv().await {
        actor.handle_message(msg).await;
    }
    tracing::debug!("All RequestExecutor handles dropped, stopping actor");
}
