mod cache;
mod history;
mod indicator;
mod quote;
mod search;

use std::sync::Arc;

use marketlens_core::{ApiResponse, CacheBackend, InMemoryBackend, MarketDataService, ServiceConfig};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Serialized envelope plus whether the operation succeeded.
pub struct CommandOutcome {
    pub success: bool,
    pub payload: Value,
}

impl CommandOutcome {
    pub fn from_response<T: Serialize>(response: &ApiResponse<T>) -> Result<Self, CliError> {
        Ok(Self {
            success: response.success,
            payload: serde_json::to_value(response)?,
        })
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    let service = build_service(cli).await?;

    match &cli.command {
        Command::Quote(args) => quote::run(args, &service).await,
        Command::History(args) => history::run(args, &service).await,
        Command::Search(args) => search::run(args, &service).await,
        Command::Indicator(args) => indicator::run(args, &service).await,
        Command::Clear(args) => cache::clear(args, &service).await,
        Command::Stats => cache::stats(&service).await,
    }
}

async fn build_service(cli: &Cli) -> Result<MarketDataService, CliError> {
    let mut config = ServiceConfig::from_env()?;
    if let Some(url) = &cli.redis_url {
        config.cache_settings.url = url.clone();
    }

    let backend: Arc<dyn CacheBackend> = if cli.memory_cache {
        debug!("using in-memory cache");
        Arc::new(InMemoryBackend::new())
    } else {
        Arc::new(config.redis_backend()?)
    };

    Ok(config.build(config.http_client(), backend).await)
}
