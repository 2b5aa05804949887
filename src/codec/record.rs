//! `key: value` pairs and records.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::protocol::Response;

/// Split a `key: value` line.
///
/// Returns `None` for lines without a key.
pub fn parse_pair(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':').filter(|&i| i > 0)?;
    let value = &line[colon + 1..];
    Some((&line[..colon], value.strip_prefix(' ').unwrap_or(value)))
}

/// Iterator over the pairs of a response, skipping lines without a key.
pub struct Pairs<'a> {
    lines: std::slice::Iter<'a, String>,
}

impl<'a> Iterator for Pairs<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.by_ref().find_map(|line| parse_pair(line))
    }
}

/// One object of a response, with its fields in wire order.
///
/// A key may occur several times (e.g. multiple `Artist` tags).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values of `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First value of `key` parsed as `T`; `None` if absent or unparsable.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// First value of `key` as a flag (`"1"` / `"0"`).
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_parsed::<u8>(key).map(|v| v != 0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Split `lines` into records, starting a new one whenever a marker key
/// appears after the current record already holds fields.
///
/// Lines without a key are skipped. An empty `markers` slice yields at most
/// one record.
pub fn group_records<S: AsRef<str>>(lines: &[S], markers: &[&str]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut current = Record::new();

    for (key, value) in lines.iter().filter_map(|l| parse_pair(l.as_ref())) {
        if !current.is_empty() && markers.iter().any(|m| *m == key) {
            records.push(std::mem::take(&mut current));
        }
        current.push(key, value);
    }

    if !current.is_empty() {
        records.push(current);
    }
    records
}

impl Response {
    /// The `key: value` pairs of this response.
    pub fn pairs(&self) -> Pairs<'_> {
        Pairs {
            lines: self.lines.iter(),
        }
    }

    /// The whole response as a single record.
    pub fn record(&self) -> Record {
        self.pairs().collect()
    }

    /// The response split into records, see [`group_records`].
    pub fn records(&self, markers: &[&str]) -> Vec<Record> {
        group_records(&self.lines, markers)
    }
}
