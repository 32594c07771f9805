pub mod format;

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::fields::FieldMap;
use format::LIST_DELIMITER;

static IF_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[IF\s+([A-Za-z][A-Za-z0-9_]*)\s*=\s*([^\]\n]*)\]").unwrap());
static IF_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\[/IF\]").unwrap());
static PHONE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\[PHONE_LINK\]").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\[PHONE\]").unwrap());
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\[EMAIL\]").unwrap());
static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[([A-Za-z][A-Za-z0-9_]*)_LIST\]").unwrap());
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Za-z][A-Za-z0-9_]*)\]").unwrap());

/// Degradations observed while resolving one template against one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeTally {
    /// Tokens whose field name matched nothing in the row.
    pub unknown_tokens: usize,
    /// `[IF ...]` markers with no `[/IF]`, left in the output as literal text.
    pub unterminated_conditionals: usize,
}

/// Resolve a template against one row: conditionals first, then typed
/// tokens, then generic placeholders. Total: malformed input degrades and is
/// tallied, never an error.
pub fn resolve(template: &str, fields: &FieldMap) -> (String, MergeTally) {
    let mut tally = MergeTally::default();
    let text = apply_conditionals(template, fields, &mut tally);
    let text = apply_typed_tokens(&text, fields, &mut tally);
    let text = apply_placeholders(&text, fields, &mut tally);
    (text, tally)
}

/// `[IF key=value] ... [/IF]`, non-nesting: each open marker pairs with the
/// nearest close marker after it. The block is kept (markers stripped) when
/// the field equals the wanted value case-insensitively; absent fields
/// compare as empty string. An open marker with no close marker stays in the
/// text untouched.
fn apply_conditionals(input: &str, fields: &FieldMap, tally: &mut MergeTally) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(caps) = IF_OPEN_RE.captures(rest) {
        let marker = caps.get(0).unwrap();
        out.push_str(&rest[..marker.start()]);
        let after = &rest[marker.end()..];

        match IF_CLOSE_RE.find(after) {
            Some(close) => {
                let key = &caps[1];
                let want = caps[2].trim().to_lowercase();
                let have = fields.get(key).trim().to_lowercase();
                if have == want {
                    out.push_str(&after[..close.start()]);
                }
                rest = &after[close.end()..];
            }
            None => {
                tally.unterminated_conditionals += 1;
                out.push_str(marker.as_str());
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// `[PHONE]`, `[PHONE_LINK]`, `[EMAIL]`, `[<X>_LIST]`. These must run before
/// generic substitution so a standalone `[PHONE]` gets formatting rather
/// than the raw digit string.
fn apply_typed_tokens(input: &str, fields: &FieldMap, tally: &mut MergeTally) -> String {
    let text = PHONE_LINK_RE.replace_all(input, |_: &Captures| {
        format::phone_link(fields.get("phone"), fields.get("phone_display"))
    });
    let text = PHONE_RE.replace_all(&text, |_: &Captures| format::format_phone(fields.get("phone")));
    let text = EMAIL_RE.replace_all(&text, |_: &Captures| format::email_link(fields.get("email")));
    let text = LIST_RE.replace_all(&text, |caps: &Captures| {
        match fields.get_prefixed(&caps[1]) {
            Some(raw) => format::delimited_list(raw, LIST_DELIMITER),
            None => {
                tally.unknown_tokens += 1;
                String::new()
            }
        }
    });
    text.into_owned()
}

/// Remaining `[FIELD_NAME]` tokens: direct case-insensitive lookup, empty
/// string for absent fields. Bracketed text that is not a valid token name
/// (spaces, punctuation) is left alone.
fn apply_placeholders(input: &str, fields: &FieldMap, tally: &mut MergeTally) -> String {
    TOKEN_RE
        .replace_all(input, |caps: &Captures| {
            let name = &caps[1];
            if !fields.contains(name) {
                tally.unknown_tokens += 1;
            }
            fields.get(name).to_string()
        })
        .into_owned()
}
