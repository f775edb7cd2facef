use std::fmt;

/// Ordered RTSP header table (RFC 2326 §4.2).
///
/// Each name maps to one or more values. Lookups are case-insensitive;
/// distinct names keep the order in which they were first inserted, so a
/// table that was parsed and not mutated serializes back byte-identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Replace every value of `name`.
    ///
    /// An existing entry keeps its position but takes the new spelling of
    /// the name; otherwise the entry is appended. Setting no values removes
    /// the header.
    pub fn set<I, V>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.remove(name);
            return;
        }
        match self.position(name) {
            Some(idx) => self.entries[idx] = (name.to_string(), values),
            None => self.entries.push((name.to_string(), values)),
        }
    }

    /// Single-value shorthand for [`set`](Self::set).
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, [value.into()]);
    }

    /// Add one value to `name`, keeping any values already present.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        match self.position(name) {
            Some(idx) => self.entries[idx].1.push(value.into()),
            None => self.entries.push((name.to_string(), vec![value.into()])),
        }
    }

    /// All values of `name`, or `None` when the header is absent.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|idx| self.entries[idx].1.as_slice())
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// Iterate over `(name, values)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append one `Name: value\r\n` line per value, in table order.
    pub fn serialize_into(&self, dst: &mut Vec<u8>) {
        for (name, values) in &self.entries {
            for value in values {
                dst.extend_from_slice(name.as_bytes());
                dst.extend_from_slice(b": ");
                dst.extend_from_slice(value.as_bytes());
                dst.extend_from_slice(b"\r\n");
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut dst = Vec::new();
        self.serialize_into(&mut dst);
        dst
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, values) in &self.entries {
            for value in values {
                writeln!(f, "{}: {}", name, value)?;
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            let name: String = name.into();
            headers.append(&name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("CSeq", "42");
        assert_eq!(headers.get_first("cseq"), Some("42"));
        assert_eq!(headers.get_first("CSEQ"), Some("42"));
        assert!(headers.get("Session").is_none());
    }

    #[test]
    fn set_keeps_position_of_existing_name() {
        let mut headers = Headers::new();
        headers.insert("CSeq", "1");
        headers.insert("session", "old");
        headers.insert("Accept", "application/sdp");

        headers.set("Session", ["new"]);

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["CSeq", "Session", "Accept"]);
        assert_eq!(headers.get("session"), Some(&["new".to_string()][..]));
    }

    #[test]
    fn set_replaces_all_values() {
        let mut headers = Headers::new();
        headers.append("Transport", "a");
        headers.append("transport", "b");
        assert_eq!(headers.get("Transport").map(<[String]>::len), Some(2));

        headers.set("Transport", ["c"]);
        assert_eq!(headers.get("Transport"), Some(&["c".to_string()][..]));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn set_without_values_removes() {
        let mut headers = Headers::new();
        headers.insert("CSeq", "1");
        headers.insert("X-Empty", "old");

        headers.set("x-empty", Vec::<String>::new());
        headers.set("Never-Present", Vec::<String>::new());

        assert_eq!(headers.get("X-Empty"), None);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.serialize(), b"CSeq: 1\r\n".to_vec());
    }

    #[test]
    fn serialize_one_line_per_value_in_order() {
        let headers: Headers = [
            ("CSeq", "3"),
            ("Transport", "RTP/AVP/TCP;interleaved=0-1"),
            ("Transport", "RTP/AVP;unicast"),
            ("Session", "abc"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            headers.serialize(),
            b"CSeq: 3\r\n\
              Transport: RTP/AVP/TCP;interleaved=0-1\r\n\
              Transport: RTP/AVP;unicast\r\n\
              Session: abc\r\n"
                .to_vec()
        );
    }

    #[test]
    fn remove_returns_values() {
        let mut headers = Headers::new();
        headers.insert("Authorization", "Basic xyz");
        assert_eq!(headers.remove("authorization"), Some(vec!["Basic xyz".to_string()]));
        assert!(headers.is_empty());
        assert_eq!(headers.remove("Authorization"), None);
    }
}
