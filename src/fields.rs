use std::collections::BTreeMap;

/// Per-row field values, keyed by lower-cased column name.
///
/// Built once per input row and never mutated afterwards. Absent fields read
/// as empty string so downstream substitution never has to branch on None.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    values: BTreeMap<String, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        FieldMap {
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.values
            .insert(name.trim().to_lowercase(), value.trim().to_string());
    }

    /// Case-insensitive lookup. Absent fields read as "".
    pub fn get(&self, name: &str) -> &str {
        self.values
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&name.trim().to_lowercase())
    }

    /// Lookup for `[<X>_LIST]` tokens: exact key first, then the first field
    /// whose name starts with `<x>_` (so `[SERVICES_LIST]` finds
    /// `services_offered`). Returns None when neither exists.
    pub fn get_prefixed(&self, prefix: &str) -> Option<&str> {
        let prefix = prefix.trim().to_lowercase();
        if let Some(v) = self.values.get(&prefix) {
            return Some(v.as_str());
        }
        let underscored = format!("{}_", prefix);
        self.values
            .iter()
            .find(|(k, _)| k.starts_with(&underscored))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Output slug for the row: business name + city, slugified, with a
    /// positional fallback when both are blank.
    pub fn slug(&self, row_index: usize) -> String {
        let base = [self.get("business_name"), self.get("city")]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| slugify(s))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        if base.is_empty() {
            format!("page-{}", row_index + 1)
        } else {
            base
        }
    }

    /// Page title for publishing: the business name, falling back to the slug.
    pub fn title(&self, row_index: usize) -> String {
        let name = self.get("business_name");
        if name.is_empty() {
            self.slug(row_index)
        } else {
            name.to_string()
        }
    }
}

/// Lower-case alphanumeric runs joined by single dashes.
fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut dash_pending = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if dash_pending && !out.is_empty() {
                out.push('-');
            }
            dash_pending = false;
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        } else {
            dash_pending = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> FieldMap {
        let mut fm = FieldMap::new();
        for (k, v) in pairs {
            fm.insert(k, v);
        }
        fm
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let fm = map(&[("Business_Name", "Acme")]);
        assert_eq!(fm.get("business_name"), "Acme");
        assert_eq!(fm.get("BUSINESS_NAME"), "Acme");
    }

    #[test]
    fn absent_reads_empty() {
        let fm = FieldMap::new();
        assert_eq!(fm.get("anything"), "");
        assert!(!fm.contains("anything"));
    }

    #[test]
    fn values_are_trimmed() {
        let fm = map(&[("city", "  Dallas  ")]);
        assert_eq!(fm.get("city"), "Dallas");
    }

    #[test]
    fn prefixed_lookup_exact_wins() {
        let fm = map(&[("services", "a"), ("services_offered", "b")]);
        assert_eq!(fm.get_prefixed("services"), Some("a"));
    }

    #[test]
    fn prefixed_lookup_falls_back() {
        let fm = map(&[("services_offered", "Repair|||Install")]);
        assert_eq!(fm.get_prefixed("services"), Some("Repair|||Install"));
        assert_eq!(fm.get_prefixed("hours"), None);
    }

    #[test]
    fn slug_from_name_and_city() {
        let fm = map(&[("business_name", "Acme Plumbing & Heating"), ("city", "Fort Worth")]);
        assert_eq!(fm.slug(0), "acme-plumbing-heating-fort-worth");
    }

    #[test]
    fn slug_positional_fallback() {
        let fm = FieldMap::new();
        assert_eq!(fm.slug(4), "page-5");
    }

    #[test]
    fn title_falls_back_to_slug() {
        let fm = map(&[("city", "Austin")]);
        assert_eq!(fm.title(0), "austin");
        let named = map(&[("business_name", "Acme")]);
        assert_eq!(named.title(0), "Acme");
    }
}
