use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "tickflow", version, about = "Single-symbol quote pipeline")]
pub struct Cli {
    /// Instrument to track. Overrides TRACKED_SYMBOL.
    #[clap(long, global = true, env = "TRACKED_SYMBOL")]
    pub symbol: Option<String>,

    /// Emit JSON logs instead of the pretty format.
    #[clap(long, global = true)]
    pub json_logs: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one quote and publish it to the stream
    Ingest,

    /// Drain pending stream records into the archive and time series
    Process,

    /// Run one trend analysis cycle and send its notification
    Analyze {
        /// Evaluate as of this epoch second instead of now
        #[clap(long)]
        at: Option<i64>,
    },

    /// Run every stage on its own cadence until interrupted
    Run,
}
