use std::str::FromStr;

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

/// Parse a number from an optional string. Missing values yield `Ok(default)`, while values that are present but
/// invalid return the parse error so that the caller can report it.
pub fn parse_number<T: FromStr>(value: Option<String>, default: T) -> Result<T, T::Err> {
    match value {
        Some(v) => v.trim().parse::<T>(),
        None => Ok(default),
    }
}
