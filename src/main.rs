mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    cli::output::set_quiet(args.quiet);
    cli::context::init(
        args.plan.as_deref(),
        args.state_dir.as_deref(),
        args.key_endpoint.as_deref(),
    );

    let result = match &args.command {
        Commands::Init {
            user,
            github,
            force,
        } => cli::commands::init::execute(user, github, *force, args.verbose),
        Commands::Plan => cli::commands::plan::execute(),
        Commands::Apply { dry_run } => cli::commands::apply::execute(*dry_run),
        Commands::Patch {
            file,
            key,
            value,
            separator,
            dry_run,
        } => cli::commands::patch::execute(file, key, value, separator, *dry_run),
        Commands::Keys {
            identity,
            account,
            path,
            timeout,
            dry_run,
        } => cli::commands::keys::execute(identity, account, path.as_deref(), *timeout, *dry_run),
        Commands::Log { since, last } => cli::commands::log::execute(since.as_deref(), *last),
    };

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(e.exit_code());
    }
}
