use marketlens_core::MarketDataService;

use crate::cli::QuoteArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(args: &QuoteArgs, service: &MarketDataService) -> Result<CommandOutcome, CliError> {
    if let [symbol] = args.symbols.as_slice() {
        return CommandOutcome::from_response(&service.get_quote(symbol).await);
    }

    let symbols: Vec<&str> = args.symbols.iter().map(String::as_str).collect();
    CommandOutcome::from_response(&service.get_quotes(&symbols).await)
}
