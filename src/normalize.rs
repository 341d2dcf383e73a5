/*!
 * Turns raw transactions into skill entries.
 *
 * The skill data shows up in a few different places depending on how a given
 * transaction was recorded: the `skill_<name>` transaction type itself, or an
 * `attrs` blob that may be JSON, a JSON-encoded string, or free text. Every
 * place that yields something is collected; deduplication happens later in `aggregate`.
 */

use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::transaction::{number_like, RawTransaction};

const SKILL_PREFIX: &str = "skill_";

const TECHNICAL_SKILLS: [&str; 7] = ["algo", "back-end", "front-end", "game", "prog", "stats", "ai"];
const TECHNOLOGIES: [&str; 8] = ["go", "js", "javascript", "sql", "html", "css", "docker", "unix"];

/// keys in `attrs` that may hold a list (or a single) skill item
const LIST_KEYS: [&str; 6] = ["skills", "skill", "technologies", "technology", "techs", "tech"];
/// keys naming a skill inside an item
const ITEM_NAME_KEYS: [&str; 5] = ["name", "skill", "tech", "slug", "label"];
/// keys naming a skill at the top level of `attrs`
const TOP_NAME_KEYS: [&str; 6] = ["name", "slug", "label", "skill", "tech", "technology"];
const CATEGORY_KEYS: [&str; 3] = ["category", "kind", "group"];
const VALUE_KEYS: [&str; 2] = ["value", "amount"];

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:skill|name|tech|technology|slug)"?\s*[:=]\s*"?([^",}\]\r\n]+)"#)
        .expect("name pattern is valid")
});

static VALUE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:value|amount|score)"?\s*[:=]\s*"?(-?\d+(?:\.\d+)?)"#)
        .expect("value pattern is valid")
});

/// What kind of skill an entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    Technical,
    Technology,
    #[default]
    Unknown,
}

impl Category {
    /// classify a raw `skill_` suffix against the fixed sets
    pub fn classify(raw: &str) -> Self {
        if TECHNICAL_SKILLS.contains(&raw) {
            Category::Technical
        } else if TECHNOLOGIES.contains(&raw) {
            Category::Technology
        } else {
            Category::Unknown
        }
    }

    /// map a free-form category label from `attrs`
    fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "technical" => Category::Technical,
            "technology" | "technologies" => Category::Technology,
            _ => Category::Unknown,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Category::Technical => "technical",
            Category::Technology => "technology",
            Category::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// One named skill with a score
#[derive(Debug, Clone, PartialEq)]
pub struct SkillEntry {
    pub name: String,
    pub category: Category,
    pub value: f64,
}

impl SkillEntry {
    /// Build an entry, dropping blank names and forcing the value into `>= 0`.
    pub fn new<T: AsRef<str>>(name: T, category: Category, value: f64) -> Option<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return None;
        }
        let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        Some(SkillEntry { name: name.to_string(), category, value })
    }
}

/// Normalize every transaction and concatenate the results, in input order.
pub fn normalize(transactions: &[RawTransaction]) -> Vec<SkillEntry> {
    let entries: Vec<SkillEntry> = transactions.iter().flat_map(normalize_one).collect();
    debug!("normalized {} transactions into {} skill entries", transactions.len(), entries.len());
    entries
}

/// All the entries a single transaction yields
pub fn normalize_one(tx: &RawTransaction) -> Vec<SkillEntry> {
    let mut acc = Vec::new();
    let amount = number_like(&tx.amount);

    if let Some(raw) = tx.kind().strip_prefix(SKILL_PREFIX) {
        acc.extend(SkillEntry::new(title_case(raw), Category::classify(raw), amount.unwrap_or_default()));
    }

    acc.extend(from_attrs(&tx.attrs, amount));
    acc
}

/// `back-end` -> `Back End`. Only the first character of each word is touched.
pub fn title_case(raw: &str) -> String {
    raw.split('-').map(|word| {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }).collect::<Vec<String>>().join(" ")
}

/// `amount || 1`
fn amount_or_one(amount: Option<f64>) -> f64 {
    match amount {
        Some(v) if v != 0.0 => v,
        _ => 1.0,
    }
}

fn from_attrs(attrs: &Value, amount: Option<f64>) -> Vec<SkillEntry> {
    match attrs {
        Value::Null => Vec::new(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => from_parsed_attrs(&parsed, amount),
            Ok(Value::String(inner)) => SkillEntry::new(inner, Category::Unknown, amount_or_one(amount)).into_iter().collect(),
            Ok(_) => Vec::new(),
            Err(_) => from_free_text(text, amount).into_iter().collect(),
        },
        other => from_parsed_attrs(other, amount),
    }
}

/// best-effort extraction from an `attrs` string that isn't JSON
fn from_free_text(text: &str, amount: Option<f64>) -> Option<SkillEntry> {
    let name = NAME_PATTERN.captures(text)?.get(1)?.as_str().trim().to_string();
    let value = VALUE_PATTERN.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or_else(|| amount_or_one(amount));
    debug!("recovered skill {} from unparseable attrs", name);
    SkillEntry::new(name, Category::Unknown, value)
}

fn from_parsed_attrs(attrs: &Value, amount: Option<f64>) -> Vec<SkillEntry> {
    let Value::Object(map) = attrs else {
        return Vec::new();
    };

    let list_field = LIST_KEYS.iter().find_map(|key| map.get(*key).filter(|v| !v.is_null()));
    let fallback_name = first_string(map, &TOP_NAME_KEYS);

    match list_field {
        Some(Value::Array(items)) => items.iter().filter_map(|item| match item {
            Value::String(name) => SkillEntry::new(name, Category::Unknown, amount_or_one(amount)),
            Value::Object(obj) => from_item(obj, None, amount),
            _ => None,
        }).collect(),
        Some(Value::Object(obj)) => from_item(obj, fallback_name, amount).into_iter().collect(),
        Some(Value::String(name)) => SkillEntry::new(name, Category::Unknown, amount_or_one(amount)).into_iter().collect(),
        _ if fallback_name.is_some() => from_item(map, fallback_name, amount).into_iter().collect(),
        _ => from_numeric_map(map),
    }
}

/// single-item extraction shared by list items and single objects
fn from_item(item: &Map<String, Value>, fallback_name: Option<&str>, amount: Option<f64>) -> Option<SkillEntry> {
    let name = first_string(item, &ITEM_NAME_KEYS).or(fallback_name)?;

    let category = if let Some(label) = first_string(item, &CATEGORY_KEYS) {
        Category::from_label(label)
    } else if item.get("technology").is_some_and(Value::is_string) {
        Category::Technology
    } else if item.get("technical").is_some_and(Value::is_string) {
        Category::Technical
    } else {
        Category::Unknown
    };

    let value = VALUE_KEYS.iter()
        .find_map(|key| item.get(*key).and_then(number_like))
        .or(amount)
        .unwrap_or_default();

    SkillEntry::new(name, category, value)
}

/// `{"go": 40, "sql": 12}` style attrs
fn from_numeric_map(map: &Map<String, Value>) -> Vec<SkillEntry> {
    if map.is_empty() || !map.values().all(Value::is_number) {
        return Vec::new();
    }
    map.iter()
        .filter_map(|(key, val)| SkillEntry::new(key, Category::Unknown, number_like(val).unwrap_or_default()))
        .collect()
}

fn first_string<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tx(kind: &str, amount: Value, attrs: Value) -> RawTransaction {
        RawTransaction { kind: Some(kind.to_string()), amount, attrs, ..Default::default() }
    }

    fn names(entries: &[SkillEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("back-end"), "Back End");
        assert_eq!(title_case("go"), "Go");
        assert_eq!(title_case("front-eND"), "Front END");
        assert_eq!(title_case("a--b"), "A  B");
    }

    #[test]
    fn test_skill_prefix_categories() {
        let entries = normalize(&[
            tx("skill_go", json!(40), Value::Null),
            tx("skill_back-end", json!(25), Value::Null),
            tx("skill_rust", json!("oops"), Value::Null),
            tx("xp", json!(1000), Value::Null),
        ]);
        assert_eq!(entries, vec![
            SkillEntry { name: "Go".into(), category: Category::Technology, value: 40.0 },
            SkillEntry { name: "Back End".into(), category: Category::Technical, value: 25.0 },
            SkillEntry { name: "Rust".into(), category: Category::Unknown, value: 0.0 },
        ]);
    }

    #[test]
    fn test_prefix_and_attrs_are_additive() {
        let entries = normalize_one(&tx("skill_sql", json!(30), json!({"skills": ["Postgres"]})));
        assert_eq!(names(&entries), vec!["Sql", "Postgres"]);
        assert_eq!(entries[1].value, 30.0);
    }

    #[test]
    fn test_list_items() {
        let attrs = json!({"technologies": [
            "Docker",
            {"name": "Go", "category": "technology", "value": 55},
            {"slug": "algo", "kind": "Technical"},
            {"label": "Unix", "technology": "yes", "amount": "12"},
            {"category": "technical"},
            7
        ]});
        let entries = normalize_one(&tx("xp", json!(0), attrs));
        assert_eq!(entries, vec![
            SkillEntry { name: "Docker".into(), category: Category::Unknown, value: 1.0 },
            SkillEntry { name: "Go".into(), category: Category::Technology, value: 55.0 },
            SkillEntry { name: "algo".into(), category: Category::Technical, value: 0.0 },
            SkillEntry { name: "Unix".into(), category: Category::Technology, value: 12.0 },
        ]);
    }

    #[test]
    fn test_single_object_uses_top_level_name() {
        let attrs = json!({"name": "Graphs", "skill": {"group": "technical", "value": 8}});
        let entries = normalize_one(&tx("xp", json!(3), attrs));
        assert_eq!(entries, vec![SkillEntry { name: "Graphs".into(), category: Category::Technical, value: 8.0 }]);
    }

    #[test]
    fn test_top_level_name_without_list() {
        let entries = normalize_one(&tx("xp", json!(9), json!({"slug": "html", "score": 3})));
        assert_eq!(entries, vec![SkillEntry { name: "html".into(), category: Category::Unknown, value: 9.0 }]);
    }

    #[test]
    fn test_numeric_map() {
        let entries = normalize_one(&tx("xp", json!(9), json!({"go": 40, "sql": 12.5})));
        assert_eq!(names(&entries), vec!["go", "sql"]);
        assert_eq!(entries[1].value, 12.5);

        // mixed maps are not numeric maps
        assert!(normalize_one(&tx("xp", json!(9), json!({"go": 40, "note": "x"}))).is_empty());
    }

    #[test]
    fn test_attrs_json_string() {
        let entries = normalize_one(&tx("xp", json!(2), json!(r#"{"tech": ["css", "js"]}"#)));
        assert_eq!(names(&entries), vec!["css", "js"]);
    }

    #[test]
    fn test_attrs_free_text_fallback() {
        let entries = normalize_one(&tx("xp", json!(4), json!("skill: Rust, score=17 (broken")));
        assert_eq!(entries, vec![SkillEntry { name: "Rust".into(), category: Category::Unknown, value: 17.0 }]);

        let entries = normalize_one(&tx("xp", Value::Null, json!("{name: \"Elixir\"")));
        assert_eq!(entries, vec![SkillEntry { name: "Elixir".into(), category: Category::Unknown, value: 1.0 }]);

        assert!(normalize_one(&tx("xp", json!(4), json!("nothing useful here {"))).is_empty());
    }

    #[test]
    fn test_values_are_clamped() {
        let entries = normalize_one(&tx("skill_go", json!(-5), Value::Null));
        assert_eq!(entries[0].value, 0.0);
        assert!(SkillEntry::new("  ", Category::Unknown, 1.0).is_none());
    }
}
