//! `jwz topic` / `jwz topics` -- create and list topics.

use anyhow::Result;

use crate::cli::TopicArgs;
use crate::context::open_repository;
use crate::output::time_ago;

pub fn run_create(args: &TopicArgs) -> Result<()> {
    let mut repo = open_repository()?;
    let id = repo.create_topic(&args.name, &args.description)?;
    println!("{id}");
    Ok(())
}

pub fn run_list() -> Result<()> {
    let repo = open_repository()?;
    let topics = repo.list_topics()?;
    if topics.is_empty() {
        println!("No topics yet. Create one with `jwz topic <name>`.");
        return Ok(());
    }
    for topic in topics {
        if topic.description.is_empty() {
            println!("{}  {:>8}", topic.name, time_ago(topic.created_at));
        } else {
            println!(
                "{}  {:>8}  {}",
                topic.name,
                time_ago(topic.created_at),
                topic.description
            );
        }
    }
    Ok(())
}
