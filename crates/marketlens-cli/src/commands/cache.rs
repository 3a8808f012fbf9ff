use marketlens_core::MarketDataService;

use crate::cli::ClearArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn clear(args: &ClearArgs, service: &MarketDataService) -> Result<CommandOutcome, CliError> {
    let response = match &args.symbol {
        Some(symbol) => service.clear_symbol_cache(symbol).await,
        None => service.clear_all_cache().await,
    };
    CommandOutcome::from_response(&response)
}

pub async fn stats(service: &MarketDataService) -> Result<CommandOutcome, CliError> {
    CommandOutcome::from_response(&service.get_service_stats().await)
}
