//! Command-line definition for `jwz`.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "jwz",
    version,
    about = "Topic-rooted messages and threads for machine-to-machine mail"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags available on every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Log debug output to stderr.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize a message store in the current directory.
    Init,

    /// Create a topic.
    Topic(TopicArgs),

    /// List all topics.
    Topics,

    /// Post a message (optionally as a reply).
    Post(PostArgs),

    /// List root messages of a topic, newest first.
    List(ListArgs),

    /// Show the full thread rooted at a message.
    Show(MessageRefArgs),

    /// Show immediate replies to a message.
    Replies(MessageRefArgs),

    /// Full-text search over message bodies.
    Search(SearchArgs),

    /// Attach a file to a message as a content-addressed blob.
    Attach(AttachArgs),

    /// List the attachments of a message.
    Attachments(MessageRefArgs),

    /// Write a blob's bytes to stdout.
    Cat(CatArgs),

    /// Generate shell completions.
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
pub struct TopicArgs {
    /// Topic name (unique within the store).
    pub name: String,

    /// Free-form description.
    #[arg(short, long, default_value = "")]
    pub description: String,
}

#[derive(Debug, Args)]
pub struct PostArgs {
    /// Target topic name.
    pub topic: String,

    /// Message body.
    pub body: String,

    /// Reply to this message (full id or unique prefix).
    #[arg(short, long)]
    pub parent: Option<String>,

    /// Sender identifier (defaults to $JWZ_SENDER).
    #[arg(long, env = "JWZ_SENDER")]
    pub from: Option<String>,

    /// Sender display name (defaults to a memorable name derived from
    /// the sender id).
    #[arg(long)]
    pub sender_name: Option<String>,

    /// Sender model label.
    #[arg(long, env = "JWZ_MODEL")]
    pub model: Option<String>,

    /// Sender role label.
    #[arg(long)]
    pub role: Option<String>,

    /// Skip capturing git state.
    #[arg(long)]
    pub no_git: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Topic name.
    pub topic: String,

    /// Maximum number of root messages.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: i64,
}

#[derive(Debug, Args)]
pub struct MessageRefArgs {
    /// Message id (full or unique prefix).
    pub id: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query text, matched verbatim as a phrase.
    pub query: String,

    /// Restrict to one topic by name.
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Maximum number of results.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: i64,
}

#[derive(Debug, Args)]
pub struct AttachArgs {
    /// Message id (full or unique prefix).
    pub id: String,

    /// File to attach.
    pub file: std::path::PathBuf,

    /// MIME label stored with the blob.
    #[arg(long)]
    pub mime: Option<String>,

    /// Display name (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct CatArgs {
    /// Blob id ("sha256:<hex>").
    pub blob: String,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    /// Target shell.
    pub shell: clap_complete::Shell,
}
