//! `jwz init` -- create a store in the current directory.

use anyhow::{Context, Result};

use jwz_storage::init_store;

pub fn run() -> Result<()> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let root = init_store(&cwd)?;

    println!("Initialized message store at {}", root.display());
    println!();
    println!("Next: `jwz topic <name>` to create a topic, then `jwz post`.");
    Ok(())
}
