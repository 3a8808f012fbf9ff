use marketlens_core::{IndicatorParams, MarketDataService};

use crate::cli::IndicatorArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(
    args: &IndicatorArgs,
    service: &MarketDataService,
) -> Result<CommandOutcome, CliError> {
    let response = service
        .calculate_indicator(&args.symbol, &args.kind, args.period, params(args))
        .await;
    CommandOutcome::from_response(&response)
}

fn params(args: &IndicatorArgs) -> Option<IndicatorParams> {
    let params = IndicatorParams {
        fast: args.fast,
        slow: args.slow,
        signal: args.signal,
        std_dev: args.std_dev,
        d_period: args.d_period,
    };
    (params != IndicatorParams::default()).then_some(params)
}
