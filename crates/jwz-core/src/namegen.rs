//! Memorable display names for senders.
//!
//! Derives a stable adjective-noun pair from a SHA-256 of the sender
//! identifier, so the same sender always renders under the same name
//! without any coordination.

use sha2::{Digest, Sha256};

const ADJECTIVES: &[&str; 32] = &[
    "amber", "bold", "brisk", "calm", "clever", "copper", "crimson", "deft",
    "dusty", "eager", "fleet", "gentle", "golden", "hazel", "ivory", "jade",
    "keen", "lively", "lunar", "mellow", "nimble", "olive", "pale", "quiet",
    "rapid", "rustic", "silent", "sly", "steady", "swift", "vivid", "wry",
];

const NOUNS: &[&str; 32] = &[
    "badger", "bison", "crane", "crow", "falcon", "ferret", "finch", "fox",
    "gecko", "hare", "heron", "ibis", "jackal", "kestrel", "lark", "lemur",
    "lynx", "marmot", "marten", "mole", "otter", "owl", "pike", "raven",
    "robin", "shrew", "sparrow", "stoat", "swan", "tern", "vole", "wren",
];

/// Returns a deterministic `adjective-noun` name for the given seed.
pub fn memorable_name(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let adjective = ADJECTIVES[(digest[0] & 0x1f) as usize];
    let noun = NOUNS[(digest[1] & 0x1f) as usize];
    format!("{adjective}-{noun}")
}
