// The loosely-typed records the progress API hands back, and helpers for poking at raw JSON.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// A single row of the `transaction` table. Every field is optional or untyped,
/// since the remote schema is not under our control.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RawTransaction {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: Value,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub attrs: Value,
    #[serde(default)]
    pub object: Option<TxObject>,
}

/// The object a transaction was awarded for
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TxObject {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawTransaction {
    /// the transaction type, or an empty string
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or_default()
    }

    /// the amount as a number, 0 when it isn't one
    pub fn amount(&self) -> f64 {
        number_like(&self.amount).unwrap_or_default()
    }

    /// lower-cased `object.type`
    pub fn object_kind(&self) -> String {
        self.object.as_ref().and_then(|o| o.kind.as_deref()).unwrap_or_default().to_lowercase()
    }

    /// lower-cased path
    pub fn path_lower(&self) -> String {
        self.path.as_deref().unwrap_or_default().to_lowercase()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Decode a JSON array of transactions one record at a time.
/// Records that don't fit the shape at all are dropped rather than failing the whole list.
pub fn decode_transactions(list: Option<&Value>) -> Vec<RawTransaction> {
    let Some(Value::Array(items)) = list else {
        debug!("transaction list missing or not an array");
        return Vec::new();
    };

    items.iter().enumerate().filter_map(|(idx, item)| {
        match serde_json::from_value::<RawTransaction>(item.clone()) {
            Ok(tx) => Some(tx),
            Err(e) => {
                debug!("skipping malformed transaction #{}: {}", idx, e);
                None
            }
        }
    }).collect()
}

/// Coerce a JSON value to a finite number: numbers pass through, numeric strings are parsed.
pub fn number_like(value: &Value) -> Option<f64> {
    let num = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    num.is_finite().then_some(num)
}

/// Parse the timestamp formats the API has been seen to emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// simple recursive algo to fetch the value from a JSON tree when our key.is.formatted.like.this.
/// Numeric segments index into arrays, so `user.0.login` works.
pub fn get_root_elem<'a>(data: &'a Value, nested_key: &str) -> Option<&'a Value> {
    let (head, rest) = match nested_key.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (nested_key, None),
    };

    let child = match data {
        Value::Object(map) => map.get(head)?,
        Value::Array(list) => list.get(head.parse::<usize>().ok()?)?,
        _ => return None,
    };

    match rest {
        Some(rest) => get_root_elem(child, rest),
        None => Some(child),
    }
}
