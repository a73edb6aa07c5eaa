//! `gateway-server` binary: wires the Postgres, S3, and SQS backends to the
//! router and serves `HTTP` until the process is signalled to stop.

use std::sync::Arc;

use aws_sdk_sqs::config::Region;
use gateway_db::postgres::{PgDatabase, PgUnsentMessages};
use gateway_db::traits::UnsentMessages;
use gateway_db::Database;
use gateway_mq::{MessageQueue, Producers, SqsMessageQueue};
use gateway_server::config::GatewayConfig;
use gateway_server::{reconcile, AppState, GatewayRouter};
use gateway_storage::{GatewayStorage, S3ObjectStore};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env()?;
    info!(
        environment = config.environment.environment.as_str(),
        platform = config.environment.platform_type.as_str(),
        "starting gateway-server"
    );

    let pool = PgPoolOptions::new().max_connections(20).connect(&config.database.url).await?;
    let db: Arc<dyn Database> = Arc::new(PgDatabase::new(pool.clone()));

    let object_store = Arc::new(S3ObjectStore::new(&config.object_storage).await?);
    let storage = GatewayStorage::new(object_store, config.object_storage.upload_length_cap);

    let aws_cfg = aws_config::from_env()
        .region(Region::new(config.message_queue.region.clone()))
        .load()
        .await;
    let mq: Arc<dyn MessageQueue> = Arc::new(SqsMessageQueue::new(aws_sdk_sqs::Client::new(&aws_cfg)));
    let unsent: Arc<dyn UnsentMessages> = Arc::new(PgUnsentMessages::new(pool));
    let producers = Arc::new(Producers::new(mq.clone(), unsent));

    let state = AppState::new(db, storage, producers.clone(), Arc::new(config.clone()));
    let router = GatewayRouter::new(state.clone()).build();

    reconcile::spawn_all(state, mq, &config.message_queue.queue_dlq);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            if let Err(err) = producers.flush_unsent().await {
                tracing::warn!(%err, "flushing unsent messages failed");
            }
        }
    });

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
