//! Value types shared by options, builders and body providers.
//!
//! # Design
//! `Values` is the query/form multimap: keys sorted, values kept in
//! insertion order per key. `Edits` records add/set operations so layers can
//! be concatenated and replayed over client defaults without losing "set"
//! semantics. `Payload` is the closed set of body/data inputs; every
//! encoding decision matches on it exhaustively.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::http::{is_form_type, is_json_type, Body};

/// Ordered multimap of string keys to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Values(BTreeMap<String, Vec<String>>);

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the values of `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Replace every value of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Append every pair of `other`, keeping existing values.
    pub fn extend(&mut self, other: Values) {
        for (key, values) in other.0 {
            self.0.entry(key).or_default().extend(values);
        }
    }

    /// Flattened `(key, value)` pairs, keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key.as_str(), value.as_str())))
    }

    /// `key=value&key2=value2`, percent-encoded.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Parse a query or form string. A leading `?` is ignored.
    pub fn parse(input: &str) -> Self {
        Self::parse_bytes(input.trim_start_matches('?').as_bytes())
    }

    pub fn parse_bytes(input: &[u8]) -> Self {
        url::form_urlencoded::parse(input).into_owned().collect()
    }

    /// Flatten a serializable struct or map into values.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(value).map_err(Error::InvalidQuery)?;
        Ok(Self::parse(&encoded))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Values {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Values::new();
        for (key, value) in iter {
            values.add(key, value);
        }
        values
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Values {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<HashMap<String, String>> for Values {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for Values {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<HashMap<String, Vec<String>>> for Values {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Values(map.into_iter().collect())
    }
}

impl From<BTreeMap<String, Vec<String>>> for Values {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Values(map)
    }
}

/// A multimap that understands append and replace.
pub(crate) trait MultiMap<K, V> {
    fn append_value(&mut self, key: K, value: V);
    fn replace_value(&mut self, key: K, value: V);
}

impl MultiMap<HeaderName, HeaderValue> for HeaderMap {
    fn append_value(&mut self, key: HeaderName, value: HeaderValue) {
        self.append(key, value);
    }

    fn replace_value(&mut self, key: HeaderName, value: HeaderValue) {
        self.insert(key, value);
    }
}

impl MultiMap<String, String> for Values {
    fn append_value(&mut self, key: String, value: String) {
        self.add(key, value);
    }

    fn replace_value(&mut self, key: String, value: String) {
        self.set(key, value);
    }
}

#[derive(Debug, Clone)]
enum Edit<K, V> {
    Add(K, V),
    Set(K, V),
}

/// Ordered log of add/set operations for one merge layer.
#[derive(Debug, Clone)]
pub(crate) struct Edits<K, V>(Vec<Edit<K, V>>);

impl<K, V> Default for Edits<K, V> {
    fn default() -> Self {
        Edits(Vec::new())
    }
}

impl<K, V> Edits<K, V> {
    pub(crate) fn add(&mut self, key: K, value: V) {
        self.0.push(Edit::Add(key, value));
    }

    pub(crate) fn set(&mut self, key: K, value: V) {
        self.0.push(Edit::Set(key, value));
    }

    /// Layer `later` on top of `self`.
    pub(crate) fn extend(&mut self, later: Edits<K, V>) {
        self.0.extend(later.0);
    }

    /// Replay the log in order over `target`.
    pub(crate) fn apply_to<M: MultiMap<K, V>>(self, target: &mut M) {
        for edit in self.0 {
            match edit {
                Edit::Add(key, value) => target.append_value(key, value),
                Edit::Set(key, value) => target.replace_value(key, value),
            }
        }
    }
}

/// Request payload accepted for "data" and explicit bodies.
pub enum Payload {
    /// Stream passed through unchanged.
    Reader(Box<dyn Read + Send>),
    Bytes(Bytes),
    Text(String),
    /// Key/value multimap.
    Values(Values),
    /// Arbitrary serializable value, encoded by content type.
    Structured(serde_json::Value),
}

impl Payload {
    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        Payload::Reader(Box::new(reader))
    }

    /// Capture any serializable value as a structured payload.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Payload::Structured)
            .map_err(Error::EncodeJson)
    }

    /// Encode into a request body for the resolved content type.
    pub(crate) fn encode(self, content_type: Option<&str>) -> Result<Body> {
        match self {
            Payload::Reader(reader) => Ok(Body::Reader(reader)),
            Payload::Bytes(bytes) => Ok(Body::Bytes(bytes)),
            Payload::Text(text) => Ok(Body::from(text)),
            Payload::Values(values) => match content_type {
                Some(ct) if is_json_type(ct) => serde_json::to_vec(&values)
                    .map(Body::from)
                    .map_err(Error::EncodeJson),
                _ => Ok(Body::from(values.encode())),
            },
            Payload::Structured(value) => match content_type {
                Some(ct) if is_json_type(ct) => serde_json::to_vec(&value)
                    .map(Body::from)
                    .map_err(Error::EncodeJson),
                Some(ct) if is_form_type(ct) => serde_urlencoded::to_string(&value)
                    .map(Body::from)
                    .map_err(Error::EncodeForm),
                _ => Err(Error::UnsupportedPayload(
                    "structured payload needs a JSON or form content type",
                )),
            },
        }
    }

    /// Flatten into query parameters for body-less methods.
    pub(crate) fn into_query(self) -> Result<Values> {
        match self {
            Payload::Reader(_) => Err(Error::UnsupportedPayload(
                "a stream cannot be encoded into a query string",
            )),
            Payload::Bytes(bytes) => Ok(Values::parse_bytes(&bytes)),
            Payload::Text(text) => Ok(Values::parse(&text)),
            Payload::Values(values) => Ok(values),
            Payload::Structured(value) => Values::from_serialize(&value),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Reader(_) => f.write_str("Payload::Reader(..)"),
            Payload::Bytes(bytes) => f.debug_tuple("Payload::Bytes").field(bytes).finish(),
            Payload::Text(text) => f.debug_tuple("Payload::Text").field(text).finish(),
            Payload::Values(values) => f.debug_tuple("Payload::Values").field(values).finish(),
            Payload::Structured(value) => f.debug_tuple("Payload::Structured").field(value).finish(),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(value))
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Bytes(value)
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<Values> for Payload {
    fn from(value: Values) -> Self {
        Payload::Values(value)
    }
}

impl From<HashMap<String, String>> for Payload {
    fn from(value: HashMap<String, String>) -> Self {
        Payload::Values(value.into())
    }
}

impl From<BTreeMap<String, String>> for Payload {
    fn from(value: BTreeMap<String, String>) -> Self {
        Payload::Values(value.into())
    }
}

impl From<HashMap<String, Vec<String>>> for Payload {
    fn from(value: HashMap<String, Vec<String>>) -> Self {
        Payload::Values(value.into())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Structured(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_add_appends_and_set_replaces() {
        let mut values = Values::new();
        values.add("a", "1");
        values.add("a", "2");
        assert_eq!(values.get_all("a"), ["1", "2"]);

        values.set("a", "3");
        assert_eq!(values.get_all("a"), ["3"]);
        assert_eq!(values.get("missing"), None);
    }

    #[test]
    fn values_encode_sorts_keys_and_escapes() {
        let values = Values::from([("name", "in here"), ("age", "3"), ("name", "x&y")]);
        assert_eq!(values.encode(), "age=3&name=in+here&name=x%26y");
    }

    #[test]
    fn values_parse_reverses_encode() {
        let values = Values::from([("k", "a b"), ("k", "c"), ("z", "=")]);
        assert_eq!(Values::parse(&values.encode()), values);
        assert_eq!(Values::parse("?x=1").get("x"), Some("1"));
    }

    #[test]
    fn values_from_serialize_flattens_structs() {
        #[derive(Serialize)]
        struct Page {
            page: u32,
            sort: &'static str,
        }
        let values = Values::from_serialize(&Page { page: 2, sort: "asc" }).unwrap();
        assert_eq!(values.get("page"), Some("2"));
        assert_eq!(values.get("sort"), Some("asc"));

        let nested = Values::from_serialize(&json!({"a": {"b": 1}}));
        assert!(matches!(nested, Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn edits_replay_set_after_add_discards_earlier_values() {
        let mut base = HeaderMap::new();
        base.append("accept", HeaderValue::from_static("text/plain"));

        let mut layer: Edits<HeaderName, HeaderValue> = Edits::default();
        layer.add(HeaderName::from_static("accept"), HeaderValue::from_static("a"));
        let mut later = Edits::default();
        later.set(HeaderName::from_static("accept"), HeaderValue::from_static("b"));
        later.add(HeaderName::from_static("accept"), HeaderValue::from_static("c"));
        layer.extend(later);
        layer.apply_to(&mut base);

        let all: Vec<_> = base.get_all("accept").iter().collect();
        assert_eq!(all, ["b", "c"]);
    }

    #[test]
    fn edits_add_preserves_lower_layers() {
        let mut base = Values::from([("q", "1")]);
        let mut layer = Edits::default();
        layer.add("q".to_string(), "2".to_string());
        layer.apply_to(&mut base);
        assert_eq!(base.get_all("q"), ["1", "2"]);
    }

    #[test]
    fn structured_payload_encodes_by_content_type() {
        let payload = Payload::from(json!({"name": "x"}));
        let body = payload.encode(Some("application/json")).unwrap();
        assert_eq!(body.as_bytes().unwrap(), br#"{"name":"x"}"#);

        let payload = Payload::from(json!({"name": "x y"}));
        let body = payload.encode(Some(crate::http::CONTENT_TYPE_FORM)).unwrap();
        assert_eq!(body.as_bytes().unwrap(), b"name=x+y");

        let payload = Payload::from(json!({"name": "x"}));
        assert!(matches!(payload.encode(None), Err(Error::UnsupportedPayload(_))));
    }

    #[test]
    fn values_payload_defaults_to_form_encoding() {
        let payload = Payload::from(Values::from([("a", "1")]));
        let body = payload.encode(None).unwrap();
        assert_eq!(body.as_bytes().unwrap(), b"a=1");

        let payload = Payload::from(Values::from([("a", "1")]));
        let body = payload.encode(Some("application/json")).unwrap();
        assert_eq!(body.as_bytes().unwrap(), br#"{"a":["1"]}"#);
    }

    #[test]
    fn raw_payloads_pass_through() {
        let body = Payload::from("raw text").encode(Some("application/json")).unwrap();
        assert_eq!(body.as_bytes().unwrap(), b"raw text");

        let body = Payload::reader(std::io::Cursor::new(b"stream".to_vec())).encode(None).unwrap();
        assert_eq!(body.into_bytes().unwrap(), Bytes::from_static(b"stream"));
    }

    #[test]
    fn query_routing_rejects_streams() {
        let values = Payload::from("a=1&b=2").into_query().unwrap();
        assert_eq!(values.get("b"), Some("2"));

        let values = Payload::from(json!({"page": 1})).into_query().unwrap();
        assert_eq!(values.get("page"), Some("1"));

        let stream = Payload::reader(std::io::empty());
        assert!(matches!(stream.into_query(), Err(Error::UnsupportedPayload(_))));
    }
}
