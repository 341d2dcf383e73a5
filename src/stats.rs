/*!
 * Scalar profile stats: identity, total XP, level, project pass/fail, audits and recent activity.
 * Everything ends up in one `ProfileStats` value that is handed to whoever needs it,
 * rather than living in shared state.
 */

use std::fmt::Display;

use clap::ValueEnum;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    adapters::{first_match, SchemaAdapter},
    client::Execute,
    error::QueryError,
    format::{format_audit_ratio, format_bytes, pass_rate, ByteScale, PLACEHOLDER},
    queries,
    transaction::{decode_transactions, get_root_elem, number_like},
    xp::total_xp,
};

/// how many distinct items the activity list keeps
const ACTIVITY_LEN: usize = 5;

/// How result records that can't be identified as project or not are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GradePolicy {
    /// leave them out of pass/fail entirely
    #[default]
    Exclude,
    /// count them as failed
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserIdentity {
    pub id: Option<i64>,
    pub login: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradeCounts {
    pub pass: u64,
    pub fail: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuditTotals {
    pub done: f64,
    pub received: f64,
}

impl AuditTotals {
    pub fn ratio(&self) -> Option<f64> {
        crate::format::audit_ratio(self.done, self.received)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub name: String,
    pub amount: f64,
}

/// Everything the stat panels and the text summary need
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileStats {
    pub user: UserIdentity,
    pub total_xp: Option<f64>,
    pub level: Option<f64>,
    pub grades: GradeCounts,
    pub audits: AuditTotals,
    pub activity: Vec<Activity>,
}

/// What a stats adapter pulls out of its response
#[derive(Debug, Clone, PartialEq)]
pub struct StatsPayload {
    pub total_xp: f64,
    pub audits: AuditTotals,
    pub level: Option<f64>,
}

fn opt_or_placeholder<T: Display>(val: Option<T>) -> String {
    val.map(|v| v.to_string()).unwrap_or_else(|| PLACEHOLDER.to_string())
}

impl Display for ProfileStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ID: {}", opt_or_placeholder(self.user.id))?;
        writeln!(f, "Login: {}", opt_or_placeholder(self.user.login.as_deref()))?;
        writeln!(f, "Total XP: {}", opt_or_placeholder(self.total_xp.map(|xp| format_bytes(xp, ByteScale::Rounded))))?;
        writeln!(f, "Level: {}", opt_or_placeholder(self.level))?;
        writeln!(f, "Passed Projects: {}", self.grades.pass)?;
        writeln!(f, "Failed Projects: {}", self.grades.fail)?;
        writeln!(f, "Pass Rate: {}", pass_rate(self.grades.pass, self.grades.fail))?;
        writeln!(f, "Audits Done: {}", format_bytes(self.audits.done, ByteScale::Precise))?;
        writeln!(f, "Audits Received: {}", format_bytes(self.audits.received, ByteScale::Precise))?;
        writeln!(f, "Audit Ratio: {}", format_audit_ratio(self.audits.done, self.audits.received))?;
        writeln!(f, "Recent activity:")?;
        if self.activity.is_empty() {
            writeln!(f, "\tNo activity")?;
        }
        for item in &self.activity {
            writeln!(f, "\t{} — {}", item.name, format_bytes(item.amount, ByteScale::Rounded))?;
        }
        Ok(())
    }
}

/// sum of `amount` over a list of transactions
fn sum_amounts(list: &Value) -> Option<f64> {
    let items = list.as_array()?;
    Some(items.iter().filter_map(|tx| tx.get("amount").and_then(number_like)).sum())
}

fn extract_stats(data: &Value) -> Option<StatsPayload> {
    let xp_list = get_root_elem(data, "xp_transactions").filter(|v| v.is_array())?;
    let done = sum_amounts(get_root_elem(data, "audits_done")?)?;
    let received = sum_amounts(get_root_elem(data, "audits_received")?)?;
    let level = get_root_elem(data, "level_tx.0.amount").and_then(number_like);

    Some(StatsPayload {
        total_xp: total_xp(&decode_transactions(Some(xp_list))),
        audits: AuditTotals { done, received },
        level,
    })
}

/// The stats query, once per user-column naming convention.
pub fn stats_adapters() -> Vec<SchemaAdapter<StatsPayload>> {
    ["userId", "user_id"].into_iter()
        .map(|key| SchemaAdapter::new(key, queries::profile_stats(key), extract_stats as fn(&Value) -> Option<StatsPayload>))
        .collect()
}

pub fn extract_identity(data: &Value) -> UserIdentity {
    UserIdentity {
        id: get_root_elem(data, "user.0.id").and_then(Value::as_i64),
        login: get_root_elem(data, "user.0.login").and_then(Value::as_str).map(str::to_string),
    }
}

/// Whether a result record belongs to a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Project,
    Other,
    Unknown,
}

/// Decide from `object.type`, then `object.name`, then `path`, in that order.
pub fn classify_result(record: &Value) -> Classification {
    let decided = |is_project: bool| if is_project { Classification::Project } else { Classification::Other };

    if let Some(kind) = get_root_elem(record, "object.type").and_then(Value::as_str) {
        return decided(kind.to_lowercase() == "project");
    }
    if let Some(name) = get_root_elem(record, "object.name").and_then(Value::as_str) {
        return decided(name.to_lowercase().contains("project"));
    }
    if let Some(path) = record.get("path").and_then(Value::as_str).filter(|p| !p.is_empty()) {
        let path = path.to_lowercase();
        return decided(!path.contains("exercise") && path.contains("project"));
    }
    Classification::Unknown
}

/// The grade as a number. An explicit `null` is a project that hasn't passed yet and reads as 0;
/// a missing or non-numeric grade can't be judged at all.
fn grade_value(record: &Value) -> Option<f64> {
    match record.get("grade")? {
        Value::Null => Some(0.0),
        other => number_like(other),
    }
}

/// Count passed (`grade >= 1`) and failed projects. Records without a gradeable value are skipped,
/// whatever the policy.
pub fn count_grades(results: &[Value], policy: GradePolicy) -> GradeCounts {
    let mut counts = GradeCounts::default();
    for record in results {
        let Some(grade) = grade_value(record) else {
            continue;
        };
        match (classify_result(record), policy) {
            (Classification::Project, _) if grade >= 1.0 => counts.pass += 1,
            (Classification::Project, _) => counts.fail += 1,
            (Classification::Unknown, GradePolicy::Fail) => counts.fail += 1,
            _ => {}
        }
    }
    counts
}

/// The first few distinct things XP was recently awarded for.
pub fn recent_activity(data: &Value) -> Vec<Activity> {
    let mut acc: Vec<Activity> = Vec::new();
    for tx in decode_transactions(data.get("transaction")) {
        let name = tx.object.as_ref().and_then(|o| o.name.clone()).filter(|n| !n.is_empty())
            .or_else(|| tx.path.as_deref().and_then(|p| p.split('/').rfind(|s| !s.is_empty())).map(str::to_string))
            .unwrap_or_else(|| tx.kind().to_string());
        if acc.iter().any(|a| a.name == name) {
            continue;
        }
        acc.push(Activity { name, amount: tx.amount() });
        if acc.len() == ACTIVITY_LEN {
            break;
        }
    }
    acc
}

/// Fetch everything for `ProfileStats`. Identity and the main stats query are required;
/// grades and activity degrade to empty on anything but an auth failure.
pub async fn fetch_profile_stats(executor: &dyn Execute, policy: GradePolicy) -> Result<ProfileStats, QueryError> {
    let user = extract_identity(&executor.execute(queries::USER_IDENTITY, json!({})).await?);
    debug!("fetching stats for user {:?}", user.login);

    let payload = first_match(executor, &stats_adapters(), json!({ "userId": user.id.unwrap_or_default() })).await?;

    let grades = match executor.execute(queries::RESULTS, json!({})).await {
        Ok(data) => {
            let results = data.get("result").and_then(Value::as_array).cloned().unwrap_or_default();
            count_grades(&results, policy)
        }
        Err(e) if e.is_auth() => return Err(e),
        Err(e) => {
            warn!("could not fetch results: {}", e);
            GradeCounts::default()
        }
    };

    let activity = match executor.execute(queries::RECENT_ACTIVITY, json!({})).await {
        Ok(data) => recent_activity(&data),
        Err(e) if e.is_auth() => return Err(e),
        Err(e) => {
            warn!("could not fetch recent activity: {}", e);
            Vec::new()
        }
    };

    Ok(ProfileStats {
        user,
        total_xp: Some(payload.total_xp),
        level: payload.level,
        grades,
        audits: payload.audits,
        activity,
    })
}
