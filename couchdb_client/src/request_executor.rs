mod request_executor_actor;
mod request_executor_error;
mod request_executor_handle;

pub use request_executor_actor::RequestExecutorActor;
pub use request_executor_error::RequestExecutorError;
pub use request_executor_handle::RequestExecutor;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::couch_command::CouchCommand;

pub(crate) enum RequestExecutorMessage {
    ExecuteCouchCommand {
        respond_to: oneshot::Sender<Result<Value, RequestExecutorError>>,
        command: CouchCommand,
    },
}
