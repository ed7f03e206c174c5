use chrono::{DateTime, Utc};
use serenity::all::UserId;

/// Discord timestamp display styles (`<t:unix:style>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    /// "in 5 minutes"
    Relative,
    /// "17 October 2026 14:05"
    LongDateTime,
}

impl TimestampStyle {
    fn code(self) -> char {
        match self {
            TimestampStyle::Relative => 'R',
            TimestampStyle::LongDateTime => 'f',
        }
    }
}

/// Format a user mention
pub fn mention_user(user_id: UserId) -> String {
    format!("<@{}>", user_id)
}

/// Format a role mention
pub fn mention_role(role_id: u64) -> String {
    format!("<@&{}>", role_id)
}

/// Render a timestamp that each client shows in its own locale
pub fn discord_timestamp(at: DateTime<Utc>, style: TimestampStyle) -> String {
    format!("<t:{}:{}>", at.timestamp(), style.code())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_discord_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(discord_timestamp(at, TimestampStyle::Relative), "<t:1704067200:R>");
        assert_eq!(discord_timestamp(at, TimestampStyle::LongDateTime), "<t:1704067200:f>");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer reason", 8), "a lon...");
        assert_eq!(truncate("ünïcödé", 5), "ün...");
    }
}
