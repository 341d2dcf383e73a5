/*!
 * XP series: which `xp` transactions count towards the total, and the running sum over time.
 */

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::transaction::RawTransaction;

/// exams and exercises only count when they live under this path segment
const MODULE_MARKER: &str = "/bh-module/";
const PISCINE_MARKER: &str = "piscine";

/// A single admitted XP award
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XpPoint {
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/// The running total at a given point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CumulativePoint {
    pub date: DateTime<Utc>,
    pub total: f64,
}

/// Returns true if the transaction counts towards the user's XP.
pub fn admits(tx: &RawTransaction) -> bool {
    let path = tx.path_lower();
    let in_module = path.contains(MODULE_MARKER) && !path.contains(PISCINE_MARKER);

    match tx.object_kind().as_str() {
        "project" | "piscine" => true,
        "exam" | "exercise" => in_module,
        _ => false,
    }
}

/// Filter, convert and order XP transactions. Records with unparsable dates are dropped,
/// negative amounts count as zero.
pub fn build_xp_series(transactions: &[RawTransaction]) -> Vec<XpPoint> {
    let mut points: Vec<XpPoint> = transactions.iter()
        .filter(|tx| admits(tx))
        .filter_map(|tx| {
            let date = tx.created_at();
            if date.is_none() {
                debug!("dropping xp transaction with bad date {:?}", tx.created_at);
            }
            Some(XpPoint { amount: tx.amount().max(0.0), date: date? })
        })
        .collect();

    // the query already orders by createdAt; this is stable, so it's a no-op in that case
    points.sort_by_key(|p| p.date);
    debug!("{} of {} xp transactions admitted", points.len(), transactions.len());
    points
}

/// Sum of every admitted amount
pub fn total_xp(transactions: &[RawTransaction]) -> f64 {
    transactions.iter().filter(|tx| admits(tx)).map(|tx| tx.amount()).sum()
}

/// Running total over a date-ordered series
pub fn cumulative(points: &[XpPoint]) -> Vec<CumulativePoint> {
    points.iter().scan(0.0, |total, p| {
        *total += p.amount;
        Some(CumulativePoint { date: p.date, total: *total })
    }).collect()
}
