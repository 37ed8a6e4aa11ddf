use chrono::Local;

/// Separator between the relayed payload and its timestamp.
pub const SEPARATOR: &str = " : ";

/// Render the outbound frame for one relayed payload.
pub fn annotate(payload: &str, timestamp: &str) -> String {
    format!("{payload}{SEPARATOR}{timestamp}")
}

/// Current wall-clock time as a human-readable RFC 2822 string.
pub fn local_timestamp() -> String {
    Local::now().to_rfc2822()
}
