//! Runtime helpers shared by command handlers: store discovery and
//! sender resolution.

use anyhow::{Context, Result};

use jwz_core::namegen::memorable_name;
use jwz_core::Sender;
use jwz_storage::{discover, Repository};

/// Discovers the store from the current directory and opens it.
pub fn open_repository() -> Result<Repository> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let root = discover(&cwd)?;
    tracing::debug!(root = %root.display(), "discovered store");
    let repo = Repository::open(&root)?;
    Ok(repo)
}

/// Builds the sender identity for a post.
///
/// No sender id means an anonymous post (`None`). A sender id without
/// an explicit display name gets a memorable name derived from the id,
/// so the same sender always renders under the same name.
pub fn resolve_sender(
    from: Option<&str>,
    display_name: Option<&str>,
    model: Option<&str>,
    role: Option<&str>,
) -> Option<Sender> {
    let id = from.map(str::trim).filter(|s| !s.is_empty())?.to_string();
    let name = match display_name.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name.to_string(),
        None => memorable_name(&id),
    };
    Some(Sender {
        id,
        name,
        model: model.map(str::trim).filter(|s| !s.is_empty()).map(Into::into),
        role: role.map(str::trim).filter(|s| !s.is_empty()).map(Into::into),
    })
}
