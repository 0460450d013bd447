//! Command-line parsing for the Altos statistic lookup.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline. The CLI stands in for the web front-end: it collects the four
//! lookup strings and renders the structured result.

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::LookupRequest;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "altos",
    version,
    about = "Real-estate market statistics by address (Altos-based)"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve an address, fetch the latest value and history of a statistic, and geocode it.
    Lookup(LookupArgs),
    /// Fetch only the latest value of a statistic (no history, no geocoding).
    Latest(LatestArgs),
    /// Print the accepted two-letter state codes.
    States,
}

/// The address and statistic to look up.
#[derive(Debug, Args, Clone)]
pub struct AddressArgs {
    /// City name.
    #[arg(long)]
    pub city: String,

    /// Two-letter US state code (case-insensitive).
    #[arg(long)]
    pub state: String,

    /// Postal code.
    #[arg(long)]
    pub zip: String,

    /// Provider statistic name (e.g. price_median, dom_mean, percent_change).
    #[arg(long, default_value = "price_median")]
    pub stat: String,
}

impl AddressArgs {
    pub fn to_request(&self) -> LookupRequest {
        LookupRequest {
            city: self.city.clone(),
            state: self.state.clone(),
            zip: self.zip.clone(),
            stat: self.stat.clone(),
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct LookupArgs {
    #[command(flatten)]
    pub address: AddressArgs,

    /// Number of weekly history points to request (1-160). Overrides ALTOS_HISTORY_LIMIT.
    #[arg(long)]
    pub history_limit: Option<u32>,

    /// Provider request timeout in seconds. Overrides ALTOS_TIMEOUT_SECS.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print the full result as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Disable the terminal plot of the history.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct LatestArgs {
    #[command(flatten)]
    pub address: AddressArgs,

    /// Provider request timeout in seconds. Overrides ALTOS_TIMEOUT_SECS.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print the full result as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_parses_with_defaults() {
        let cli = Cli::parse_from([
            "altos", "lookup", "--city", "Austin", "--state", "tx", "--zip", "78701",
        ]);
        let Command::Lookup(args) = cli.command else {
            panic!("expected lookup");
        };
        assert_eq!(args.address.stat, "price_median");
        assert_eq!(args.history_limit, None);
        assert!(!args.json);
        assert_eq!(cli.verbose, 0);

        let req = args.address.to_request();
        assert_eq!(req.state, "tx");
        assert_eq!(req.zip, "78701");
    }

    #[test]
    fn latest_accepts_global_verbosity() {
        let cli = Cli::parse_from([
            "altos", "latest", "--city", "Boise", "--state", "ID", "--zip", "83702", "--stat",
            "dom_mean", "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Latest(ref a) if a.address.stat == "dom_mean"));
    }
}
