//! CLI argument definitions for marketlens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Fetch quotes for one or more symbols |
//! | `history` | Fetch historical OHLCV bars |
//! | `search` | Search for instruments |
//! | `indicator` | Compute a technical indicator |
//! | `clear` | Clear cached market data |
//! | `stats` | Show rate-limit and cache statistics |
//!
//! # Examples
//!
//! ```bash
//! marketlens quote AAPL MSFT --pretty
//! marketlens history AAPL --start 2024-01-01 --end 2024-03-31 --interval 1wk
//! marketlens indicator AAPL macd --fast 8 --slow 21
//! marketlens --memory-cache search apple --limit 5
//! ```

use clap::{Args, Parser, Subcommand};

/// Cache-aside market data from the command line.
#[derive(Debug, Parser)]
#[command(
    name = "marketlens",
    author,
    version,
    about = "Cached market data and technical indicators"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Use a process-local cache instead of Redis.
    #[arg(long, global = true, default_value_t = false)]
    pub memory_cache: bool,

    /// Redis URL, overriding REDIS_URL.
    #[arg(long, global = true)]
    pub redis_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the latest quote for one or more symbols.
    ///
    ///   marketlens quote AAPL
    ///   marketlens quote AAPL MSFT GOOGL --pretty
    Quote(QuoteArgs),

    /// Fetch historical OHLCV bars for a date range.
    History(HistoryArgs),

    /// Search for instruments by symbol or company name.
    Search(SearchArgs),

    /// Compute a technical indicator over the last year of daily closes.
    ///
    /// Kinds: sma, ema, rsi, macd, bollinger, stochastic.
    Indicator(IndicatorArgs),

    /// Clear cached data for one symbol, or everything.
    Clear(ClearArgs),

    /// Show rate-limit counters and cache status.
    Stats,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub symbol: String,

    /// First day, YYYY-MM-DD.
    #[arg(long)]
    pub start: String,

    /// Last day, YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    pub end: Option<String>,

    /// Bar interval: 1d, 1wk or 1mo.
    #[arg(long, default_value = "1d")]
    pub interval: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long, default_value_t = marketlens_core::service::DEFAULT_SEARCH_LIMIT)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct IndicatorArgs {
    pub symbol: String,

    pub kind: String,

    #[arg(long, default_value_t = marketlens_core::service::DEFAULT_INDICATOR_PERIOD)]
    pub period: usize,

    /// MACD fast EMA period.
    #[arg(long)]
    pub fast: Option<usize>,

    /// MACD slow EMA period.
    #[arg(long)]
    pub slow: Option<usize>,

    /// MACD signal EMA period.
    #[arg(long)]
    pub signal: Option<usize>,

    /// Bollinger band width in standard deviations.
    #[arg(long)]
    pub std_dev: Option<f64>,

    /// Stochastic %D smoothing period.
    #[arg(long)]
    pub d_period: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Only clear entries for this symbol.
    #[arg(long)]
    pub symbol: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_indicator_overrides() {
        let cli = Cli::try_parse_from([
            "marketlens",
            "--memory-cache",
            "indicator",
            "AAPL",
            "macd",
            "--fast",
            "8",
            "--std-dev",
            "2.5",
        ])
        .expect("valid arguments");

        assert!(cli.memory_cache);
        let Command::Indicator(args) = cli.command else {
            panic!("expected indicator command");
        };
        assert_eq!(args.kind, "macd");
        assert_eq!(args.period, 14);
        assert_eq!(args.fast, Some(8));
        assert_eq!(args.std_dev, Some(2.5));
        assert_eq!(args.slow, None);
    }

    #[test]
    fn quote_requires_a_symbol() {
        assert!(Cli::try_parse_from(["marketlens", "quote"]).is_err());
    }
}
