use clap::{CommandFactory, FromArgMatches};

use schedtool::commands::negotiate::command_negotiate;
use schedtool::commands::policy::command_policy;
use schedtool::commands::schedd::command_schedd;
use schedtool::common::cli::{RootOptions, SubCommand};
use schedtool::common::config::load_params;
use schedtool::common::setup::setup_logging;
use schedtool::output::make_output;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let matches = RootOptions::command().get_matches();
    let top_opts = match RootOptions::from_arg_matches(&matches) {
        Ok(opts) => opts,
        Err(error) => error.exit(),
    };

    setup_logging(top_opts.common.verbose);

    let output = make_output(top_opts.common.output_mode);
    let result = match load_params(&top_opts.common) {
        Ok(params) => match top_opts.subcmd {
            SubCommand::Policy(opts) => command_policy(opts, &params, output.as_ref()),
            SubCommand::Schedd(opts) => command_schedd(opts, output.as_ref()).await,
            SubCommand::Negotiate(opts) => {
                command_negotiate(opts, &params, output.as_ref()).await
            }
        },
        Err(error) => Err(error),
    };

    if let Err(e) = result {
        output.print_error(e);
        std::process::exit(1);
    }

    Ok(())
}
