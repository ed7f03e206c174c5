use std::time::Duration;

/// How often the expiry scheduler sweeps the mute registry
pub const DEFAULT_MUTE_SWEEP_INTERVAL_SECONDS: u64 = 10;

/// Upper bound on the platform cleanup for a single expired mute
pub const DEFAULT_MUTE_RELEASE_TIMEOUT_SECONDS: u64 = 15;

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Longest mute accepted from the `/mute` command (one year)
pub const MAX_MUTE_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs < 60 {
        format!("{} second{}", total_secs, if total_secs == 1 { "" } else { "s" })
    } else if total_secs < 3600 {
        let mins = total_secs / 60;
        format!("{} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if total_secs < 86400 {
        let hours = total_secs / 3600;
        format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else if total_secs < 604800 {
        let days = total_secs / 86400;
        format!("{} day{}", days, if days == 1 { "" } else { "s" })
    } else {
        let weeks = total_secs / 604800;
        format!("{} week{}", weeks, if weeks == 1 { "" } else { "s" })
    }
}
