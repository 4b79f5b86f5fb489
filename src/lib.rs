mod application;
mod domain;
mod infrastructure;
mod interfaces;

use crate::application::{AnalyzeUseCase, CurrentUpload, UploadUseCase};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::upload_store::UploadRepository;
use crate::infrastructure::llm_clients::{GeminiClient, LLMClient};
use crate::infrastructure::storage::UploadStorage;
use crate::interfaces::http::{start_server, HttpState};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub use crate::domain::error::{AppError, Result};

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load configuration, open the store and serve HTTP until shutdown.
pub async fn run() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    let repository = Arc::new(UploadRepository::new(
        &config.database_path,
        &config.schema_path,
    ));
    repository.connect().await.map_err(|err| {
        error!(error = %err, db = %config.database_path.display(), "Failed to open upload database");
        err
    })?;

    if config.gemini.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; analysis requests will fail");
    }

    let storage = Arc::new(UploadStorage::new(&config.uploads_dir));
    info!(uploads = %storage.root().display(), "Upload files directory");
    let llm_client: Arc<dyn LLMClient> = Arc::new(GeminiClient::new());

    let state = HttpState {
        repository: repository.clone(),
        current_upload: Arc::new(CurrentUpload::new()),
        upload_use_case: Arc::new(UploadUseCase::new(repository.clone(), storage)),
        analyze_use_case: Arc::new(AnalyzeUseCase::new(
            llm_client,
            repository.clone(),
            config.llm_config(),
        )),
        max_upload_bytes: config.max_upload_bytes,
    };

    let served = match start_server(state, &config.host, config.port) {
        Ok(server) => server.await,
        Err(err) => Err(err),
    };

    repository.close().await;
    info!("Shutdown complete");

    served.map_err(|err| {
        error!(error = %err, "HTTP server failed");
        AppError::Io(err)
    })
}
