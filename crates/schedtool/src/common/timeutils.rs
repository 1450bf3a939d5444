use std::time::{SystemTime, UNIX_EPOCH};

/// Parses seconds since the epoch, or an RFC 3339 timestamp
/// (`2024-05-01 12:00:00` or `2024-05-01T12:00:00Z`).
pub fn parse_timestamp(text: &str) -> anyhow::Result<i64> {
    let text = text.trim();
    if let Ok(seconds) = text.parse::<i64>() {
        return Ok(seconds);
    }
    let time = humantime::parse_rfc3339_weak(text)?;
    Ok(epoch_seconds(time))
}

pub fn epoch_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs() as i64,
        Err(error) => -(error.duration().as_secs() as i64),
    }
}
