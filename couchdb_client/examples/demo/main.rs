use couchdb_client::{
    events::{CouchEvent, CouchEventKind},
    ConnectionBuilder, QueryOptions, ViewParams,
};
use serde_json::json;
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let mut builder = ConnectionBuilder::from_env();
    if std::env::var(couchdb_client::URL_ENV_VAR).is_err() {
        builder = builder.set_url("http://localhost:5984");
    }
    let mut connection = builder.build()?;
    connection
        .notifier_mut()
        .on(CouchEventKind::Saved, |event: &CouchEvent| {
            tracing::info!("Saved: {:?}", event.response());
        });

    let info = connection.fetch_info(true).await?;
    println!("{:#}", info);

    let databases = connection.fetch_all_databases(true).await?;
    println!("Databases: {:?}", databases);

    let database_name = "couchdb_client_demo";
    let mut database = if databases.iter().any(|name| name == database_name) {
        connection.database(database_name)
    } else {
        connection.create_database(database_name).await?
    };
    database.fetch_info().await?;

    let mut design = database.document("_design/demo");
    design.set_data(json!({
        "_id": "_design/demo",
        "views": {
            "by_kind": {"map": "function(doc) { if (doc.kind) { emit(doc.kind, 1); } }"}
        }
    }));
    if design.fetch_info().await.is_err() {
        design.save(&QueryOptions::new()).await?;
        design.fetch_info().await?;
    }

    let mut widget = database.document("widget-1");
    if let Ok(existing) = widget.open(&QueryOptions::new()).await {
        tracing::info!("widget-1 already exists at {}", existing["_rev"]);
    } else {
        widget.set_data(json!({"_id": "widget-1", "kind": "widget"}));
        widget.save(&QueryOptions::new()).await?;
    }

    for view_name in design.all_views() {
        let mut view = design.view(&view_name, ViewParams::new().set_limit(10));
        let rows = view.fetch_data().await?;
        println!("{}: {:#}", view_name, rows);
    }

    let mut options = QueryOptions::new();
    options.insert("include_docs".into(), json!(true));
    let documents = database.fetch_all_documents(&options).await?;
    println!("{:#}", documents);

    Ok(())
}

fn setup_tracing() {
    // Redirect all `log`'s events to the subscriber
    LogTracer::init().expect("Failed to set logger");
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let formatting_layer =
        BunyanFormattingLayer::new("couchdb-client-demo".into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    set_global_default(subscriber).expect("Failed to set subscriber");
}
