//! `jwz list` -- root messages of a topic, newest first.

use anyhow::Result;

use crate::cli::ListArgs;
use crate::context::open_repository;
use crate::output::message_line;

pub fn run(args: &ListArgs) -> Result<()> {
    let repo = open_repository()?;
    let messages = repo.list_messages(&args.topic, args.limit)?;
    if messages.is_empty() {
        println!("No messages in '{}'.", args.topic.trim());
        return Ok(());
    }
    for message in &messages {
        println!("{}", message_line(message));
    }
    Ok(())
}
