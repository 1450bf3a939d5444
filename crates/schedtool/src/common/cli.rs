use std::path::PathBuf;

use clap::Parser;

use crate::commands::negotiate::NegotiateOpts;
use crate::commands::policy::PolicyOpts;
use crate::commands::schedd::ScheddOpts;
use crate::common::config::parse_knob;
use crate::output::OutputMode;

#[derive(Parser)]
#[command(author, version, about = "Job policy evaluation and negotiation sessions")]
pub struct RootOptions {
    #[clap(flatten)]
    pub common: CommonOpts,

    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

// Common CLI options
#[derive(Parser)]
pub struct CommonOpts {
    /// Configuration file (a flat TOML table of knobs)
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        global = true,
        env = "SCHEDTOOL_CONFIG",
        help_heading("GLOBAL OPTIONS")
    )]
    pub config: Option<PathBuf>,

    /// Overrides a configuration knob, e.g. `--set SYSTEM_PERIODIC_HOLD=false`
    #[arg(
        long = "set",
        value_name = "KNOB=VALUE",
        value_parser = parse_knob,
        global = true,
        help_heading("GLOBAL OPTIONS")
    )]
    pub knobs: Vec<(String, String)>,

    /// Sets output formatting
    #[arg(
        long,
        env = "SCHEDTOOL_OUTPUT_MODE",
        default_value_t = OutputMode::Cli,
        value_enum,
        global = true,
        help_heading("GLOBAL OPTIONS")
    )]
    pub output_mode: OutputMode,

    /// Enables more detailed log output
    #[arg(
        long,
        short = 'v',
        env = "SCHEDTOOL_VERBOSE",
        global = true,
        help_heading("GLOBAL OPTIONS")
    )]
    pub verbose: bool,
}

#[derive(Parser)]
pub enum SubCommand {
    /// Evaluates the periodic and on-exit policy of job ads
    Policy(PolicyOpts),
    /// Offers idle jobs to negotiators
    Schedd(ScheddOpts),
    /// Runs a negotiation session against a scheduler
    Negotiate(NegotiateOpts),
}
