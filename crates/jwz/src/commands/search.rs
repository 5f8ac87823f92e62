//! `jwz search` -- full-text search over message bodies.

use anyhow::Result;

use crate::cli::SearchArgs;
use crate::context::open_repository;
use crate::output::message_line;

pub fn run(args: &SearchArgs) -> Result<()> {
    let repo = open_repository()?;
    let hits = repo.search(&args.query, args.topic.as_deref(), args.limit)?;
    if hits.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    for message in &hits {
        println!("{}", message_line(message));
    }
    Ok(())
}
