//! `jwz attach` / `jwz attachments` / `jwz cat` -- blob operations.

use std::io::Write;

use anyhow::{Context, Result};

use crate::cli::{AttachArgs, CatArgs, MessageRefArgs};
use crate::context::open_repository;

pub fn run_attach(args: &AttachArgs) -> Result<()> {
    let mut repo = open_repository()?;

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let name = args.name.clone().or_else(|| {
        args.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    });

    let blob_id = repo.put_blob(&bytes, args.mime.as_deref())?;
    repo.attach_blob(&args.id, &blob_id, name.as_deref())?;

    println!("{blob_id}");
    Ok(())
}

pub fn run_attachments(args: &MessageRefArgs) -> Result<()> {
    let repo = open_repository()?;
    let attachments = repo.list_attachments(&args.id)?;
    if attachments.is_empty() {
        println!("No attachments.");
        return Ok(());
    }
    for attachment in &attachments {
        let info = repo.fetch_blob(&attachment.blob_id)?;
        let name = attachment.name.as_deref().unwrap_or("(unnamed)");
        let mime = info.mime_type.as_deref().unwrap_or("-");
        println!("{}  {}  {} bytes  {}", attachment.blob_id, name, info.size, mime);
    }
    Ok(())
}

pub fn run_cat(args: &CatArgs) -> Result<()> {
    let repo = open_repository()?;
    let bytes = repo.get_blob(&args.blob)?;
    std::io::stdout()
        .write_all(&bytes)
        .context("failed to write blob to stdout")?;
    Ok(())
}
