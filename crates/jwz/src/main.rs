//! `jwz` -- local message store CLI.
//!
//! Parses arguments with clap and dispatches to command handlers. The
//! store itself lives in `jwz-storage`; this binary is a thin surface
//! over it.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    if cli.global.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("jwz=debug,jwz_storage=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Topic(args) => commands::topic::run_create(&args),
        Commands::Topics => commands::topic::run_list(),
        Commands::Post(args) => commands::post::run(&args),
        Commands::List(args) => commands::list::run(&args),
        Commands::Show(args) => commands::show::run_thread(&args),
        Commands::Replies(args) => commands::show::run_replies(&args),
        Commands::Search(args) => commands::search::run(&args),
        Commands::Attach(args) => commands::blob::run_attach(&args),
        Commands::Attachments(args) => commands::blob::run_attachments(&args),
        Commands::Cat(args) => commands::blob::run_cat(&args),
        Commands::Completion(args) => commands::completion::run(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
