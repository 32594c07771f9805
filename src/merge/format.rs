//! Formatters for typed field values. All of them are total: empty or
//! malformed input produces an empty or pass-through result, never an error.

/// Delimiter between items in list-valued fields.
pub const LIST_DELIMITER: &str = "|||";

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `XXX-XXX-XXXX` when exactly ten digits remain after stripping, otherwise
/// the raw value unchanged.
pub fn format_phone(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.len() == 10 {
        format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        raw.to_string()
    }
}

/// Click-to-call fragment. Target is the digits-only number, label is
/// `display` when given, the formatted number otherwise. A value with no
/// digits produces no fragment.
pub fn phone_link(raw: &str, display: &str) -> String {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return String::new();
    }
    let label = if display.trim().is_empty() {
        format_phone(raw)
    } else {
        display.trim().to_string()
    };
    format!(r#"<a href="tel:{}">{}</a>"#, digits, label)
}

/// Click-to-mail fragment; empty input produces no fragment.
pub fn email_link(raw: &str) -> String {
    let addr = raw.trim();
    if addr.is_empty() {
        return String::new();
    }
    format!(r#"<a href="mailto:{}">{}</a>"#, addr, addr)
}

/// Split on `delimiter`, trim each item, drop empties, emit an unordered
/// list. No surviving items means no fragment at all, not an empty `<ul>`.
pub fn delimited_list(raw: &str, delimiter: &str) -> String {
    let items: Vec<&str> = raw
        .split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul>");
    for item in items {
        out.push_str("<li>");
        out.push_str(item);
        out.push_str("</li>");
    }
    out.push_str("</ul>");
    out
}
