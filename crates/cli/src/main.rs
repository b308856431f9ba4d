use cadview_cli::cli::Cli;
use cadview_cli::output::{ResultBuilder, print_result};
use cadview_cli::{commands, context::CommandContext, logging};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.global.verbosity());

	let format = cli.global.format;
	let name = cli.command.name();
	let started = ResultBuilder::<serde_json::Value>::new(name);

	let outcome = match CommandContext::from_args(&cli.global) {
		Ok(ctx) => commands::dispatch(cli.command, &ctx).await,
		Err(err) => Err(err),
	};

	match outcome {
		Ok(output) => {
			print_result(&started.data(output.data).diagnostics(output.diagnostics).build(), format);
		}
		Err(err) => {
			error!(target = "cadview", error = %err, "command failed");
			print_result(&started.error(err.code(), err.to_string()).build(), format);
			std::process::exit(1);
		}
	}
}
