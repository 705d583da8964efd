//! Case-insensitive SIP header storage, with compact-form expansion (§4.2).

/// Expand a compact header form to its canonical name. Unknown names
/// (already canonical, or genuinely unknown) are returned unchanged.
pub fn expand_compact_name(name: &str) -> &str {
    match name {
        "i" | "I" => "Call-ID",
        "f" | "F" => "From",
        "t" | "T" => "To",
        "m" | "M" => "Contact",
        "l" | "L" => "Content-Length",
        "v" | "V" => "Via",
        "c" | "C" => "Content-Type",
        "s" | "S" => "Subject",
        "e" | "E" => "Content-Encoding",
        "k" | "K" => "Supported",
        "r" | "R" => "Refer-To",
        other => other,
    }
}

fn canonical_key(name: &str) -> String {
    expand_compact_name(name).to_ascii_lowercase()
}

/// An ordered, case-insensitive, multi-value header map.
///
/// Preserves insertion order and duplicate headers (e.g. multiple
/// `Via:` lines), since both matter for SIP: `Via` order reflects the
/// request's routing path and display code wants the original casing.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, expanding compact forms to their canonical name.
    pub fn push(&mut self, name: &str, value: String) {
        let canonical = expand_compact_name(name);
        self.entries.push((canonical.to_string(), value));
    }

    /// First value for a header name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = canonical_key(name);
        self.entries
            .iter()
            .find(|(n, _)| n.to_ascii_lowercase() == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for a header name, in the order they appeared.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        let key = canonical_key(name);
        self.entries
            .iter()
            .filter(move |(n, _)| n.to_ascii_lowercase() == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extract the user part of a `From`/`To`/`Contact`-style header value,
/// e.g. `"Alice" <sip:alice@example.com>;tag=abc` -> `alice`.
pub fn user_part(header_value: &str) -> Option<&str> {
    let uri_start = header_value.find('<').map(|i| i + 1).unwrap_or(0);
    let rest = &header_value[uri_start..];
    let rest = rest.strip_prefix("sip:").or_else(|| rest.strip_prefix("sips:"))?;
    let end = rest
        .find(['@', '>', ';'])
        .unwrap_or(rest.len());
    let user = &rest[..end];
    if user.is_empty() { None } else { Some(user) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_names_expand() {
        assert_eq!(expand_compact_name("i"), "Call-ID");
        assert_eq!(expand_compact_name("m"), "Contact");
        assert_eq!(expand_compact_name("X-Custom"), "X-Custom");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut h = HeaderMap::new();
        h.push("Call-ID", "abc@host".to_string());
        assert_eq!(h.get("call-id"), Some("abc@host"));
        assert_eq!(h.get("CALL-ID"), Some("abc@host"));
    }

    #[test]
    fn compact_header_push_is_stored_canonically() {
        let mut h = HeaderMap::new();
        h.push("i", "abc@host".to_string());
        assert_eq!(h.get("Call-ID"), Some("abc@host"));
    }

    #[test]
    fn multiple_via_headers_preserved_in_order() {
        let mut h = HeaderMap::new();
        h.push("Via", "SIP/2.0/UDP a.example.com".to_string());
        h.push("Via", "SIP/2.0/UDP b.example.com".to_string());
        let vias: Vec<_> = h.get_all("Via").collect();
        assert_eq!(vias, vec!["SIP/2.0/UDP a.example.com", "SIP/2.0/UDP b.example.com"]);
    }

    #[test]
    fn user_part_strips_display_name_and_params() {
        assert_eq!(
            user_part("\"Alice\" <sip:alice@example.com>;tag=abc"),
            Some("alice")
        );
        assert_eq!(user_part("<sip:bob@10.0.0.1:5060>"), Some("bob"));
        assert_eq!(user_part("sip:carol@example.com"), Some("carol"));
    }
}
