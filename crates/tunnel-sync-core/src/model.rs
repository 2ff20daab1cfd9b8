//! Shared data model
//!
//! Snapshot entities used by both sides of a reconciliation run:
//!
//! - [`RouteEntry`]: a hostname → service routing rule
//! - [`OriginOptions`]: the open-ended per-route origin settings
//! - [`DnsRecord`]: a DNS record pointing a hostname at the tunnel
//! - [`DnsTarget`]: the canonical address DNS records must point to

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// DNS record type managed by the sync engine
pub const CNAME: &str = "CNAME";

/// TTL value meaning "automatic"
pub const AUTOMATIC_TTL: u32 = 1;

/// A single option value inside [`OriginOptions`]
///
/// Closed set of scalar and nested variants; compared structurally.
/// There is no null: nulls are dropped at every nesting level on input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<OptionValue>),
    Map(BTreeMap<String, OptionValue>),
}

impl OptionValue {
    /// Convert a decoded value, returning `None` for `null`
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Integer(i)),
                None => n.as_f64().map(Self::Float),
            },
            Value::String(s) => Some(Self::String(s)),
            Value::Array(items) => Some(Self::List(
                items.into_iter().filter_map(Self::from_value).collect(),
            )),
            Value::Object(map) => Some(Self::Map(
                map.into_iter()
                    .filter_map(|(k, v)| Self::from_value(v).map(|v| (k, v)))
                    .collect(),
            )),
        }
    }
}

impl<'de> Deserialize<'de> for OptionValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Self::from_value(Value::deserialize(deserializer)?)
            .ok_or_else(|| <D::Error as serde::de::Error>::custom("option value cannot be null"))
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Origin settings attached to a route
///
/// Keys are kept sorted, so equality never depends on the order in which
/// options were written. `null` values are dropped on input, nested ones
/// included, and an absent
/// mapping is the same value as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OriginOptions(BTreeMap<String, OptionValue>);

impl OriginOptions {
    /// Create an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no options are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of options
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Look up a single option
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    /// Set an option, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Option<OptionValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Iterate options in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for OriginOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'de> Deserialize<'de> for OriginOptions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
        Ok(Self(
            raw.unwrap_or_default()
                .into_iter()
                .filter_map(|(k, v)| OptionValue::from_value(v).map(|v| (k, v)))
                .collect(),
        ))
    }
}

/// A routing rule: traffic for `hostname` goes to `service`
///
/// Used for both desired and actual snapshots. Identity is the hostname;
/// equality compares hostname, service and options by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Public hostname, unique within a snapshot
    pub hostname: String,

    /// Target service URI (e.g. "http://10.0.0.1:8080")
    pub service: String,

    /// Origin request settings
    #[serde(
        rename = "originRequest",
        alias = "origin_request",
        default,
        skip_serializing_if = "OriginOptions::is_empty"
    )]
    pub origin_options: OriginOptions,
}

impl RouteEntry {
    /// Create a route without origin options
    pub fn new(hostname: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            service: service.into(),
            origin_options: OriginOptions::new(),
        }
    }

    /// Add an origin option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.origin_options.insert(key, value);
        self
    }

    /// Replace the whole option set
    pub fn with_options(mut self, options: OriginOptions) -> Self {
        self.origin_options = options;
        self
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.hostname, self.service)
    }
}

/// A DNS record as seen by the sync engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Remote handle; only present on records fetched from the remote system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    /// Record type ("CNAME" for routed hostnames)
    pub record_type: String,

    /// Record name (the routed hostname)
    pub name: String,

    /// Record content
    pub target: String,

    /// Whether traffic is proxied by the remote system
    pub proxied: bool,

    /// Time-to-live; [`AUTOMATIC_TTL`] means automatic
    pub ttl: u32,
}

impl DnsRecord {
    /// Build the desired record for a routed hostname
    ///
    /// Proxying and automatic TTL are fixed policy for routed hostnames.
    pub fn routed(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            record_id: None,
            record_type: CNAME.to_string(),
            name: name.into(),
            target: target.into(),
            proxied: true,
            ttl: AUTOMATIC_TTL,
        }
    }

    /// Attach a remote handle
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }
}

/// Where routed hostnames must point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsTarget {
    /// Canonical routing address (e.g. "<tunnel-id>.cfargotunnel.com")
    pub canonical: String,

    /// Reserved suffix identifying records owned by the sync engine
    pub managed_suffix: String,
}

impl DnsTarget {
    /// Create a target
    pub fn new(canonical: impl Into<String>, managed_suffix: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            managed_suffix: managed_suffix.into(),
        }
    }

    /// Whether a record is owned by the sync engine
    ///
    /// Only CNAME records pointing somewhere under the reserved suffix are
    /// managed; everything else in the zone is left alone.
    pub fn is_managed(&self, record: &DnsRecord) -> bool {
        record.record_type.eq_ignore_ascii_case(CNAME) && record.target.ends_with(&self.managed_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_key_order_does_not_affect_equality() {
        let a = RouteEntry::new("h.example.com", "http://s")
            .with_option("a", 1i64)
            .with_option("b", 2i64);
        let b = RouteEntry::new("h.example.com", "http://s")
            .with_option("b", 2i64)
            .with_option("a", 1i64);

        assert_eq!(a, b);
        assert_eq!(b, a);
    }

    #[test]
    fn different_option_values_are_unequal() {
        let a = RouteEntry::new("h.example.com", "http://s").with_option("noTLSVerify", true);
        let b = RouteEntry::new("h.example.com", "http://s").with_option("noTLSVerify", false);
        assert_ne!(a, b);
    }

    #[test]
    fn absent_null_and_empty_options_are_equal() {
        let absent: RouteEntry =
            serde_json::from_str(r#"{"hostname":"h.example.com","service":"http://s"}"#).unwrap();
        let null: RouteEntry = serde_json::from_str(
            r#"{"hostname":"h.example.com","service":"http://s","originRequest":null}"#,
        )
        .unwrap();
        let empty: RouteEntry = serde_json::from_str(
            r#"{"hostname":"h.example.com","service":"http://s","originRequest":{}}"#,
        )
        .unwrap();

        assert_eq!(absent, null);
        assert_eq!(absent, empty);
    }

    #[test]
    fn null_option_values_are_dropped() {
        let route: RouteEntry = serde_json::from_str(
            r#"{"hostname":"h.example.com","service":"http://s","originRequest":{"noTLSVerify":true,"caPool":null}}"#,
        )
        .unwrap();

        assert_eq!(route.origin_options.len(), 1);
        assert_eq!(route.origin_options.get("noTLSVerify"), Some(&OptionValue::Bool(true)));
    }

    #[test]
    fn nested_options_parse_structurally() {
        let route: RouteEntry = serde_json::from_str(
            r#"{"hostname":"h.example.com","service":"http://s","originRequest":{"connectTimeout":30,"access":{"required":true,"audTag":["x"]}}}"#,
        )
        .unwrap();

        assert_eq!(route.origin_options.get("connectTimeout"), Some(&OptionValue::Integer(30)));
        let mut access = BTreeMap::new();
        access.insert("audTag".to_string(), OptionValue::List(vec!["x".into()]));
        access.insert("required".to_string(), OptionValue::Bool(true));
        assert_eq!(route.origin_options.get("access"), Some(&OptionValue::Map(access)));
    }

    #[test]
    fn nested_null_values_are_dropped() {
        let route: RouteEntry = serde_json::from_str(
            r#"{"hostname":"h.example.com","service":"http://s","originRequest":{"access":{"required":true,"audTag":null},"ipRules":[null,"10.0.0.0/8"]}}"#,
        )
        .unwrap();

        let expected = RouteEntry::new("h.example.com", "http://s")
            .with_option(
                "access",
                OptionValue::Map(BTreeMap::from([("required".to_string(), OptionValue::Bool(true))])),
            )
            .with_option("ipRules", OptionValue::List(vec!["10.0.0.0/8".into()]));
        assert_eq!(route, expected);
    }

    #[test]
    fn whole_numbers_stay_integers() {
        let route: RouteEntry = serde_json::from_str(
            r#"{"hostname":"h.example.com","service":"http://s","originRequest":{"connectTimeout":30,"keepAliveRatio":0.5}}"#,
        )
        .unwrap();

        assert_eq!(route.origin_options.get("connectTimeout"), Some(&OptionValue::Integer(30)));
        assert_eq!(route.origin_options.get("keepAliveRatio"), Some(&OptionValue::Float(0.5)));
    }

    #[test]
    fn empty_options_are_not_serialized() {
        let json = serde_json::to_value(RouteEntry::new("h.example.com", "http://s")).unwrap();
        assert!(json.get("originRequest").is_none());
    }

    #[test]
    fn managed_filter_requires_cname_and_suffix() {
        let target = DnsTarget::new("t1.cfargotunnel.com", ".cfargotunnel.com");

        assert!(target.is_managed(&DnsRecord::routed("a.example.com", "t2.cfargotunnel.com")));

        let mut a_record = DnsRecord::routed("a.example.com", "t2.cfargotunnel.com");
        a_record.record_type = "A".to_string();
        assert!(!target.is_managed(&a_record));

        assert!(!target.is_managed(&DnsRecord::routed("a.example.com", "lb.example.net")));
    }

    #[test]
    fn routed_record_uses_policy_constants() {
        let record = DnsRecord::routed("a.example.com", "t1.cfargotunnel.com");
        assert_eq!(record.record_type, "CNAME");
        assert!(record.proxied);
        assert_eq!(record.ttl, AUTOMATIC_TTL);
        assert!(record.record_id.is_none());
    }
}
