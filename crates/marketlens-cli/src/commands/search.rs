use marketlens_core::MarketDataService;

use crate::cli::SearchArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(
    args: &SearchArgs,
    service: &MarketDataService,
) -> Result<CommandOutcome, CliError> {
    let response = service.search_stocks(&args.query, args.limit).await;
    CommandOutcome::from_response(&response)
}
