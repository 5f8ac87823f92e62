//! `jwz show` / `jwz replies` -- read a thread or its direct replies.

use anyhow::Result;

use crate::cli::MessageRefArgs;
use crate::context::open_repository;
use crate::output::message_line;

pub fn run_thread(args: &MessageRefArgs) -> Result<()> {
    let repo = open_repository()?;
    for message in repo.thread(&args.id)? {
        println!("{}", message_line(&message));
    }
    Ok(())
}

pub fn run_replies(args: &MessageRefArgs) -> Result<()> {
    let repo = open_repository()?;
    let replies = repo.replies(&args.id)?;
    if replies.is_empty() {
        println!("No replies.");
        return Ok(());
    }
    for message in &replies {
        println!("{}", message_line(message));
    }
    Ok(())
}
