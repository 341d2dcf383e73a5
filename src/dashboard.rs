/*!
 * One dashboard run. The skills, xp, stats and stat-panels branches run as independent tasks
 * on a `JoinSet`; a branch that fails for any reason other than a rejected credential logs it
 * and renders its placeholder, leaving its siblings alone.
 *
 * The stat panels need the profile stats, so the stats branch publishes its state on a
 * `watch` channel and the stat-panels branch waits for it to leave `Pending`. A dropped
 * sender counts as failed, so the wait always ends.
 *
 * The first auth failure cancels the run and is returned as `SessionExpired`.
 */

use std::{path::PathBuf, sync::Arc};

use serde_json::{json, Value};
use thiserror::Error;
use tokio::{sync::watch, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    adapters::{first_match, SchemaAdapter},
    aggregate::aggregate,
    client::Execute,
    error::QueryError,
    geometry::{bars, gauge, radar, xp_line, BarConfig, GaugeConfig, Projection, RadarConfig, UnauditedPolicy, XpConfig},
    normalize::{normalize, Category},
    panels::{
        audit::{AuditBarsPanel, AuditGaugePanel},
        grades::GradesPanel,
        skills::{RadarPanel, SkillBarsPanel},
        xp::XpPanel,
        Panel, SvgSink,
    },
    queries,
    stats::{fetch_profile_stats, GradeCounts, GradePolicy, ProfileStats},
    transaction::{decode_transactions, RawTransaction},
    xp::{build_xp_series, cumulative, total_xp},
};

/// Policies that change what gets drawn
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardConfig {
    pub grade_policy: GradePolicy,
    pub unaudited: UnauditedPolicy,
}

/// Readiness of the scalar profile stats
#[derive(Debug, Clone, Default)]
pub enum StatsState {
    #[default]
    Pending,
    Ready(Arc<ProfileStats>),
    Failed,
}

impl StatsState {
    pub fn is_pending(&self) -> bool {
        matches!(self, StatsState::Pending)
    }
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("session expired: {0}")]
    SessionExpired(#[source] QueryError),
    #[error("cancelled")]
    Cancelled,
}

/// What a finished run produced
#[derive(Debug, Default)]
pub struct Report {
    /// every SVG file written, in completion order
    pub written: Vec<PathBuf>,
    /// None if the stats branch failed
    pub stats: Option<ProfileStats>,
}

/// a branch only fails outright on auth errors; everything else ends in a placeholder
type BranchResult = Result<Vec<PathBuf>, QueryError>;

/// Skill transactions, with `attrs` when the schema allows it.
pub fn skill_adapters() -> Vec<SchemaAdapter<Vec<RawTransaction>>> {
    vec![
        SchemaAdapter::new("skills-with-attrs", queries::SKILLS_WITH_ATTRS, transaction_list),
        SchemaAdapter::new("skills-minimal", queries::SKILLS_MINIMAL, transaction_list),
    ]
}

fn transaction_list(data: &Value) -> Option<Vec<RawTransaction>> {
    let list = data.get("transaction").filter(|v| v.is_array())?;
    Some(decode_transactions(Some(list)))
}

/// Run every branch to completion, or until the first auth failure or cancellation.
pub async fn run(executor: Arc<dyn Execute>, sink: Arc<SvgSink>, config: DashboardConfig, cancel: CancellationToken) -> Result<Report, DashboardError> {
    let (stats_tx, stats_rx) = watch::channel(StatsState::Pending);

    let mut set: JoinSet<BranchResult> = JoinSet::new();
    set.spawn(skills_branch(executor.clone(), sink.clone()));
    set.spawn(xp_branch(executor.clone(), sink.clone()));
    set.spawn(stats_branch(executor, config.grade_policy, stats_tx));
    set.spawn(stat_panels_branch(stats_rx.clone(), sink, config.unaudited));

    let mut report = Report::default();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                set.abort_all();
                return Err(DashboardError::Cancelled);
            }
            joined = set.join_next() => match joined {
                None => break,
                Some(Ok(Ok(paths))) => report.written.extend(paths),
                Some(Ok(Err(e))) => {
                    error!("credential rejected, stopping: {}", e);
                    cancel.cancel();
                    set.abort_all();
                    return Err(DashboardError::SessionExpired(e));
                }
                Some(Err(e)) => error!("branch did not finish: {}", e),
            }
        }
    }

    if let StatsState::Ready(stats) = &*stats_rx.borrow() {
        report.stats = Some(stats.as_ref().clone());
    }
    Ok(report)
}

/// Render a panel, logging instead of failing.
fn render<P: Panel>(sink: &SvgSink, panel: &P) -> Option<PathBuf> {
    match sink.render(panel) {
        Ok(path) => Some(path),
        Err(e) => {
            error!("error rendering {}: {}", panel.mount(), e);
            None
        }
    }
}

async fn skills_branch(executor: Arc<dyn Execute>, sink: Arc<SvgSink>) -> BranchResult {
    let skills = match first_match(executor.as_ref(), &skill_adapters(), json!({})).await {
        Ok(transactions) => aggregate(&normalize(&transactions)),
        Err(e) if e.is_auth() => return Err(e),
        Err(e) => {
            warn!("skills unavailable: {}", e);
            Vec::new()
        }
    };
    let technical = skills.iter().filter(|s| s.category == Category::Technical).count();
    info!("got {} distinct skills, {} of them technical", skills.len(), technical);

    let chart = radar(&skills, &RadarConfig::default());
    if chart.is_no_data() {
        info!("no skills to chart");
    }

    Ok([
        render(&sink, &RadarPanel::new(chart)),
        render(&sink, &SkillBarsPanel::new(bars(&skills, &BarConfig::default()))),
    ].into_iter().flatten().collect())
}

async fn xp_branch(executor: Arc<dyn Execute>, sink: Arc<SvgSink>) -> BranchResult {
    let transactions = match executor.execute(queries::XP_PROGRESS, json!({})).await {
        Ok(data) => decode_transactions(data.get("transaction")),
        Err(e) if e.is_auth() => return Err(e),
        Err(e) => {
            warn!("xp progression unavailable: {}", e);
            Vec::new()
        }
    };
    let series = cumulative(&build_xp_series(&transactions));
    debug!("xp series has {} points", series.len());

    let panel = XpPanel::new(xp_line(&series, &XpConfig::default()), total_xp(&transactions));
    Ok(render(&sink, &panel).into_iter().collect())
}

async fn stats_branch(executor: Arc<dyn Execute>, policy: GradePolicy, tx: watch::Sender<StatsState>) -> BranchResult {
    match fetch_profile_stats(executor.as_ref(), policy).await {
        Ok(stats) => {
            tx.send_replace(StatsState::Ready(Arc::new(stats)));
            Ok(Vec::new())
        }
        Err(e) => {
            tx.send_replace(StatsState::Failed);
            if e.is_auth() {
                return Err(e);
            }
            warn!("profile stats unavailable: {}", e);
            Ok(Vec::new())
        }
    }
}

async fn stat_panels_branch(mut rx: watch::Receiver<StatsState>, sink: Arc<SvgSink>, unaudited: UnauditedPolicy) -> BranchResult {
    let state = rx.wait_for(|s| !s.is_pending()).await.map(|s| s.clone()).unwrap_or(StatsState::Failed);

    let (grades, audit_gauge, audits) = match state {
        StatsState::Ready(stats) => (
            stats.grades,
            gauge(stats.audits.ratio(), unaudited, &GaugeConfig::default()),
            Some(stats.audits),
        ),
        _ => (GradeCounts::default(), Projection::NoData, None),
    };

    Ok([
        render(&sink, &GradesPanel::new(grades)),
        render(&sink, &AuditGaugePanel::new(audit_gauge)),
        render(&sink, &AuditBarsPanel::new(audits)),
    ].into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use crate::client::ReplayExecutor;

    use super::*;

    fn replay(lines: &[Value]) -> anyhow::Result<Arc<dyn Execute>> {
        let raw = lines.iter().map(Value::to_string).collect::<Vec<_>>().join("\n");
        Ok(Arc::new(ReplayExecutor::from_ndjson(&raw)?))
    }

    fn out_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("skillboard-{}-{}", name, std::process::id()))
    }

    fn stats_lines() -> Vec<Value> {
        vec![
            json!({"operation": "UserIdentity", "response": {"data": {"user": [{"id": 7, "login": "neo"}]}}}),
            json!({"operation": "ProfileStats_userId", "response": {"data": {
                "xp_transactions": [{"amount": 25_000, "path": "/bh-module/ascii-art", "object": {"type": "project"}}],
                "audits_done": [{"amount": 3000}],
                "audits_received": [{"amount": 2000}],
                "level_tx": [{"amount": 9}]
            }}}),
            json!({"operation": "ProjectResults", "response": {"data": {"result": [
                {"grade": 1, "object": {"type": "project"}},
                {"grade": 1, "object": {"type": "project"}},
                {"grade": 0, "object": {"type": "project"}}
            ]}}}),
            json!({"operation": "RecentActivity", "response": {"data": {"transaction": [
                {"type": "xp", "amount": 25_000, "object": {"name": "ascii-art"}}
            ]}}}),
        ]
    }

    #[tokio::test]
    async fn test_full_run() -> anyhow::Result<()> {
        let mut lines = stats_lines();
        lines.push(json!({"operation": "SkillsTx", "response": {"data": {"transaction": [
            {"type": "skill_go", "amount": 40},
            {"type": "skill_go", "amount": 75},
            {"type": "skill_algo", "amount": 30}
        ]}}}));
        lines.push(json!({"operation": "XpTx", "response": {"data": {"transaction": [
            {"amount": 10_000, "createdAt": "2024-01-02T10:00:00Z", "path": "/bh-module/go-reloaded", "object": {"type": "project"}},
            {"amount": 15_000, "createdAt": "2024-02-02T10:00:00Z", "path": "/bh-module/ascii-art", "object": {"type": "project"}}
        ]}}}));

        let dir = out_dir("full");
        let sink = Arc::new(SvgSink::new(&dir)?);
        let report = run(replay(&lines)?, sink, DashboardConfig::default(), CancellationToken::new()).await?;

        let mut names: Vec<String> = report.written.iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        assert_eq!(names, vec!["audit-bars.svg", "audit-graph.svg", "grades-graph.svg", "skills-bars.svg", "skills-graph.svg", "xp-graph.svg"]);

        let stats = report.stats.expect("stats should be ready");
        assert_eq!(stats.user.login.as_deref(), Some("neo"));
        assert_eq!(stats.level, Some(9.0));

        assert!(read_to_string(dir.join("skills-bars.svg"))?.contains("75%"));
        assert!(read_to_string(dir.join("grades-graph.svg"))?.contains("67% pass rate"));
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_branch_renders_placeholder() -> anyhow::Result<()> {
        // skills: both adapters rejected by the schema; stats: nothing recorded
        let lines = vec![
            json!({"operation": "SkillsTx", "response": {"errors": [{"message": "field 'attrs' not found"}]}}),
            json!({"operation": "SkillsTxMinimal", "status": 500, "body": "oops"}),
            json!({"operation": "XpTx", "response": {"data": {"transaction": []}}}),
        ];

        let dir = out_dir("placeholders");
        let sink = Arc::new(SvgSink::new(&dir)?);
        let report = run(replay(&lines)?, sink, DashboardConfig::default(), CancellationToken::new()).await?;

        assert_eq!(report.written.len(), 6);
        assert!(report.stats.is_none());
        assert!(read_to_string(dir.join("skills-graph.svg"))?.contains("No skills data."));
        assert!(read_to_string(dir.join("xp-graph.svg"))?.contains("No XP data."));
        assert!(read_to_string(dir.join("grades-graph.svg"))?.contains("No grades yet."));
        assert!(read_to_string(dir.join("audit-graph.svg"))?.contains("No audit ratio."));
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_auth_failure_expires_session() -> anyhow::Result<()> {
        let mut lines = stats_lines();
        lines.push(json!({"operation": "XpTx", "status": 401, "body": "jwt expired"}));

        let dir = out_dir("auth");
        let sink = Arc::new(SvgSink::new(&dir)?);
        let cancel = CancellationToken::new();
        let err = run(replay(&lines)?, sink, DashboardConfig::default(), cancel.clone()).await.unwrap_err();

        assert!(matches!(err, DashboardError::SessionExpired(QueryError::Unauthorized { status: 401 })));
        assert!(cancel.is_cancelled());
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_xp_total_keeps_corrections() -> anyhow::Result<()> {
        let lines = vec![json!({"operation": "XpTx", "response": {"data": {"transaction": [
            {"amount": 10_000, "createdAt": "2024-01-02T10:00:00Z", "path": "/bh-module/go-reloaded", "object": {"type": "project"}},
            {"amount": -2_000, "createdAt": "2024-01-03T10:00:00Z", "path": "/bh-module/go-reloaded", "object": {"type": "project"}}
        ]}}})];

        let dir = out_dir("xp-total");
        let sink = Arc::new(SvgSink::new(&dir)?);
        run(replay(&lines)?, sink, DashboardConfig::default(), CancellationToken::new()).await?;

        let svg = read_to_string(dir.join("xp-graph.svg"))?;
        assert!(svg.contains("Total 8 KB"));
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_stat_panels_wait_for_stats() -> anyhow::Result<()> {
        let (tx, rx) = watch::channel(StatsState::Pending);
        let dir = out_dir("wait");
        let sink = Arc::new(SvgSink::new(&dir)?);

        let waiting = tokio::spawn(stat_panels_branch(rx, sink, UnauditedPolicy::Sliver));
        let stats = ProfileStats { grades: GradeCounts { pass: 3, fail: 1 }, ..Default::default() };
        tx.send_replace(StatsState::Ready(Arc::new(stats)));

        assert_eq!(waiting.await??.len(), 3);
        assert!(read_to_string(dir.join("grades-graph.svg"))?.contains("75% pass rate"));
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_failed() -> anyhow::Result<()> {
        let (tx, rx) = watch::channel(StatsState::Pending);
        drop(tx);
        let dir = out_dir("dropped");
        let sink = Arc::new(SvgSink::new(&dir)?);

        stat_panels_branch(rx, sink, UnauditedPolicy::Sliver).await?;
        assert!(read_to_string(dir.join("audit-graph.svg"))?.contains("No audit ratio."));
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
