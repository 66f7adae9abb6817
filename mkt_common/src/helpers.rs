/// Page size used when a listing request gives no usable limit.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;
/// Largest page size a listing request may ask for.
pub const MAX_PAGE_LIMIT: i64 = 200;

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

/// Turns a raw `limit` query value into a page size in `[1, MAX_PAGE_LIMIT]`.
///
/// Missing or non-numeric values give [`DEFAULT_PAGE_LIMIT`]. Numbers outside the range are clamped.
pub fn clamp_limit(value: Option<&str>) -> i64 {
    match value.map(|s| s.trim().parse::<i64>()) {
        Some(Ok(n)) => n.clamp(1, MAX_PAGE_LIMIT),
        _ => DEFAULT_PAGE_LIMIT,
    }
}

/// Page size for message listings. A missing value gives [`DEFAULT_PAGE_LIMIT`]. Anything that is present but not a
/// number of at least 1 gives 1, and large values are capped at [`MAX_PAGE_LIMIT`].
pub fn clamp_message_limit(value: Option<&str>) -> i64 {
    match value.map(|s| s.trim().parse::<i64>()) {
        None => DEFAULT_PAGE_LIMIT,
        Some(Ok(n)) => n.clamp(1, MAX_PAGE_LIMIT),
        Some(Err(_)) => 1,
    }
}
