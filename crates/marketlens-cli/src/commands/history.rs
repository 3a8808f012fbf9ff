use marketlens_core::{parse_date, today_utc, Interval, MarketDataService};

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(
    args: &HistoryArgs,
    service: &MarketDataService,
) -> Result<CommandOutcome, CliError> {
    let start = parse_date(&args.start)?;
    let end = match &args.end {
        Some(raw) => parse_date(raw)?,
        None => today_utc(),
    };
    let interval: Interval = args.interval.parse()?;

    let response = service
        .get_historical_data(&args.symbol, start, end, interval)
        .await;
    CommandOutcome::from_response(&response)
}
