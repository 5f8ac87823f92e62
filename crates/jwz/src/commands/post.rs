//! `jwz post` -- post a message or reply.

use anyhow::{Context, Result};

use crate::cli::PostArgs;
use crate::context::{open_repository, resolve_sender};

pub fn run(args: &PostArgs) -> Result<()> {
    let mut repo = open_repository()?;

    let sender = resolve_sender(
        args.from.as_deref(),
        args.sender_name.as_deref(),
        args.model.as_deref(),
        args.role.as_deref(),
    );

    let git = if args.no_git {
        None
    } else {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        jwz_git::capture(&cwd)
    };

    let id = repo.create_message(
        &args.topic,
        args.parent.as_deref(),
        &args.body,
        sender,
        git,
    )?;
    println!("{id}");
    Ok(())
}
