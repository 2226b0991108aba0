/*!
couchdb_client is a thin async client library for the CouchDB HTTP API.

It is organised as a small hierarchy of handles. A [`Connection`] points at a
server, a [`Database`] at one database on that server, a [`Document`] at one
document inside a database and a [`View`] at one view of a design document.
Each handle builds its own resource path, issues exactly one HTTP request per
operation, stores the decoded JSON on itself and publishes it to its
[`Notifier`](events::Notifier) as a [`CouchEvent`](events::CouchEvent).

Every request runs on a [`RequestExecutor`](request_executor::RequestExecutor), a
small actor owning a `reqwest::Client`. This library requires tokio.

# Example
```rust,no_run
# tokio_test::block_on(async {
use couchdb_client::{Connection, QueryOptions};

let connection = Connection::builder()
    .set_url("http://localhost:5984")
    .set_credentials("admin", "password")
    .build()?;

let mut document = connection.database("inventory").document("widget-1");
let data = document.open(&QueryOptions::new()).await?;
println!("{}", data);
# Ok::<(), couchdb_client::CouchDbError>(())
# });
```

Nothing is fetched when a handle is created. Call `fetch_info` (or any other
operation) explicitly.
*/

mod client_configuration;
mod connection;
mod couchdb_error;
mod database;
mod document;
mod resource_base;
mod view;

pub mod couch_command;
pub mod events;
pub mod request_executor;
pub mod resource_path;
pub mod view_params;

pub use client_configuration::*;
pub use connection::*;
pub use couch_command::{QueryOptions, ReplicationOptions};
pub use couchdb_error::*;
pub use database::*;
pub use document::*;
pub use resource_base::*;
pub use view::*;
pub use view_params::{Stale, ViewParams};

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use crate::events::{CouchEvent, Notifier};

    /// Returns a notifier that records every event it sees, and the shared record.
    pub(crate) fn recording_notifier() -> (Notifier, Arc<Mutex<Vec<CouchEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut notifier = Notifier::default();
        notifier.subscribe(move |event: &CouchEvent| {
            sink.lock().unwrap().push(event.clone());
        });
        (notifier, seen)
    }
}
