//! Plain-text output helpers.

use jwz_core::idgen::system_ms;
use jwz_core::Message;

/// Shortest prefix shown for an id in listings. Long enough to stay
/// unambiguous in practice; `jwz show` accepts it back.
const SHORT_ID_LEN: usize = 10;

pub fn short_id(id: &str) -> &str {
    &id[..SHORT_ID_LEN.min(id.len())]
}

/// Renders a millisecond timestamp relative to now.
pub fn time_ago(created_at_ms: i64) -> String {
    time_ago_at(created_at_ms, system_ms() as i64)
}

fn time_ago_at(created_at_ms: i64, now_ms: i64) -> String {
    let delta_s = (now_ms - created_at_ms).max(0) / 1000;
    match delta_s {
        0..=1 => "just now".to_string(),
        2..=59 => format!("{delta_s}s ago"),
        60..=3_599 => format!("{}m ago", delta_s / 60),
        3_600..=86_399 => format!("{}h ago", delta_s / 3_600),
        _ => format!("{}d ago", delta_s / 86_400),
    }
}

/// One-line listing form: id, age, sender, body, reply count.
pub fn message_line(message: &Message) -> String {
    let mut line = format!(
        "{}  {:>8}",
        short_id(&message.id),
        time_ago(message.created_at)
    );
    if let Some(sender) = &message.sender {
        line.push_str(&format!("  <{}>", sender.name));
    }
    line.push_str(&format!("  {}", message.body));
    if message.reply_count > 0 {
        line.push_str(&format!("  [{} replies]", message.reply_count));
    }
    line
}
