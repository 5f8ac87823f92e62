//! Command handlers. Each module exposes `run` functions returning
//! `anyhow::Result<()>`; `main` maps errors to a short message and a
//! nonzero exit code.

pub mod blob;
pub mod completion;
pub mod init;
pub mod list;
pub mod post;
pub mod search;
pub mod show;
pub mod topic;
