//! Free-text duration parsing for moderation commands ("1h30m", "2 days", "45s")

use std::time::Duration;

use crate::constants::timeouts::MAX_MUTE_DURATION;

fn unit_seconds(unit: &str) -> Option<u64> {
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(60 * 60),
        "d" | "day" | "days" => Some(24 * 60 * 60),
        "w" | "wk" | "wks" | "week" | "weeks" => Some(7 * 24 * 60 * 60),
        _ => None,
    }
}

/// Parse a mute duration. `Ok(None)` means indefinite (empty input or any zero total, e.g. "0" or "0m").
pub fn parse_duration(input: &str) -> Result<Option<Duration>, String> {
    let normalized: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if normalized.is_empty() || normalized == "0" {
        return Ok(None);
    }

    let mut total: u64 = 0;
    let mut chars = normalized.chars().peekable();

    while chars.peek().is_some() {
        let mut number = String::new();
        while let Some(c) = chars.peek().copied().filter(|c| c.is_ascii_digit()) {
            number.push(c);
            chars.next();
        }

        let mut unit = String::new();
        while let Some(c) = chars.peek().copied().filter(|c| c.is_alphabetic()) {
            unit.push(c);
            chars.next();
        }

        if number.is_empty() {
            return Err(format!("Expected a number in \"{}\", e.g. 10m or 1h30m.", input.trim()));
        }
        if unit.is_empty() {
            return Err(format!("{} needs a unit: s, m, h, d or w.", number));
        }

        let value: u64 = number
            .parse()
            .map_err(|_| format!("{} is not a valid number.", number))?;
        let multiplier = unit_seconds(&unit)
            .ok_or_else(|| format!("{} is an invalid unit of time! s/m/h/d/w are valid.", unit))?;

        total = value
            .checked_mul(multiplier)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| "That duration is too long.".to_string())?;
    }

    if total == 0 {
        return Ok(None);
    }

    let duration = Duration::from_secs(total);
    if duration > MAX_MUTE_DURATION {
        return Err("Mutes can last at most one year. Leave the duration empty for an indefinite mute.".to_string());
    }

    Ok(Some(duration))
}
