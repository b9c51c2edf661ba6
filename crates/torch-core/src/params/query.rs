//! `name=value` query strings.

use fnv::FnvHashMap;

/// Raw override strings keyed by parameter name.
#[derive(Clone, Debug, Default)]
pub struct QueryOverrides {
    values: FnvHashMap<String, String>,
}

impl QueryOverrides {
    /// Parse `a=1&b=2&flag`, with or without a leading `?`. `+` decodes to a
    /// space and `%XX` escapes are decoded; the first occurrence of a repeated
    /// name wins.
    pub fn parse(query: &str) -> Self {
        let mut out = Self::default();
        out.merge_query(query);
        out
    }

    /// Add pairs from another query string without replacing existing names.
    pub fn merge_query(&mut self, query: &str) {
        let query = query.trim().trim_start_matches('?');
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = decode_component(name);
            if name.is_empty() {
                continue;
            }
            self.values
                .entry(name)
                .or_insert_with(|| decode_component(value));
        }
    }

    /// Set `name`, replacing any earlier value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decode `+` and `%XX`. Malformed escapes are kept literally.
pub fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => match bytes.get(i + 1..i + 3).and_then(|h| hex_pair(h[0], h[1])) {
                Some(b) => {
                    out.push(b);
                    i += 2;
                }
                None => out.push(b'%'),
            },
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encode everything outside the unreserved URL set.
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b',' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let h = (hi as char).to_digit(16)?;
    let l = (lo as char).to_digit(16)?;
    Some((h * 16 + l) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_escapes_and_plus() {
        assert_eq!(decode_component("a%20b+c"), "a b c");
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%zz"), "%zz");
        assert_eq!(decode_component("%5B1%2C2%5D"), "[1,2]");
    }

    #[test]
    fn encode_then_parse_keeps_urls_intact() {
        let url = "https://example.com/a b?x=1&y=2";
        let q = QueryOverrides::parse(&format!("track={}", encode_component(url)));
        assert_eq!(q.get("track"), Some(url));
    }
}
