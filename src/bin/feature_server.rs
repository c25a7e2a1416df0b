use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use odfs::{
    feature_router, init_logging, log_server_bind, log_server_start, log_store_opened,
    DeriveConfig, LoggingConfig, RecordFetcher, SqliteRecordFetcher,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = LoggingConfig::from_env();
    init_logging(&logging_cfg)?;
    log_server_start(&logging_cfg);

    let store_path = PathBuf::from(
        std::env::var("ODFS_STORE_PATH")
            .map_err(|_| "ODFS_STORE_PATH must point at the feature store sqlite file")?,
    );
    let fetcher: Arc<dyn RecordFetcher> = Arc::new(SqliteRecordFetcher::open(&store_path)?);
    log_store_opened(&store_path);

    let addr: SocketAddr = std::env::var("ODFS_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;

    let app = feature_router(fetcher, DeriveConfig::default());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    log_server_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
