use std::time::Duration;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a duration given as a whole number of seconds. Zero and unparseable values yield `None`.
pub fn parse_duration_secs(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().filter(|s| *s > 0).map(Duration::from_secs)
}
