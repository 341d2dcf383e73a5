// GraphQL query texts. Every query is named; the replay executor matches on that name.

/// skill transactions including `attrs`
pub const SKILLS_WITH_ATTRS: &str = r#"
query SkillsTx {
  transaction(
    where: { type: { _like: "skill_%" } }
    order_by: { createdAt: desc }
    limit: 10000
  ) {
    amount
    type
    attrs
  }
}
"#;

/// skill transactions for schemas that refuse `attrs`
pub const SKILLS_MINIMAL: &str = r#"
query SkillsTxMinimal {
  transaction(
    where: { type: { _like: "skill_%" } }
    order_by: { createdAt: desc }
    limit: 10000
  ) {
    amount
    type
  }
}
"#;

pub const XP_PROGRESS: &str = r#"
query XpTx {
  transaction(
    where: { type: { _eq: "xp" } }
    order_by: { createdAt: asc }
    limit: 10000
  ) {
    amount
    createdAt
    path
    object { type }
  }
}
"#;

pub const USER_IDENTITY: &str = r#"
query UserIdentity {
  user {
    id
    login
  }
}
"#;

pub const RESULTS: &str = r#"
query ProjectResults {
  result(limit: 10000) {
    grade
    path
    object { type name }
  }
}
"#;

pub const RECENT_ACTIVITY: &str = r#"
query RecentActivity {
  transaction(
    where: { type: { _eq: "xp" } }
    order_by: { createdAt: desc }
    limit: 50
  ) {
    type
    amount
    createdAt
    path
    object { name }
  }
}
"#;

/// The scalar stats query, keyed on whichever user column the schema uses.
/// The user id travels as a variable.
pub fn profile_stats(user_key: &str) -> String {
    format!(r#"
query ProfileStats_{user_key}($userId: Int!) {{
  xp_transactions: transaction(
    where: {{ type: {{ _eq: "xp" }}, {user_key}: {{ _eq: $userId }} }}
    order_by: {{ createdAt: asc }}
    limit: 10000
  ) {{
    amount
    path
    createdAt
    object {{ type name }}
  }}
  audits_done: transaction(
    where: {{ type: {{ _eq: "up" }}, {user_key}: {{ _eq: $userId }} }}
    limit: 10000
  ) {{
    amount
  }}
  audits_received: transaction(
    where: {{ type: {{ _eq: "down" }}, {user_key}: {{ _eq: $userId }} }}
    limit: 10000
  ) {{
    amount
  }}
  level_tx: transaction(
    where: {{ type: {{ _eq: "level" }}, {user_key}: {{ _eq: $userId }} }}
    order_by: {{ createdAt: desc }}
    limit: 1
  ) {{
    amount
  }}
}}
"#)
}

/// The name after `query`, e.g. `XpTx`
pub fn operation_name(query: &str) -> Option<&str> {
    let rest = query.trim_start().strip_prefix("query")?.trim_start();
    let end = rest.find(|c: char| !(c.is_alphanumeric() || c == '_')).unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}
