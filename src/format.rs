// helpers for turning raw aggregates into the strings we show the user

/// shown wherever a value isn't available
pub const PLACEHOLDER: &str = "—";

/// How many decimals the KB tier gets. The profile summary rounds to whole KB,
/// the audit figures keep two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteScale {
    Rounded,
    Precise,
}

/// Format a raw amount on a B/KB/MB scale, using decimal thresholds.
pub fn format_bytes(value: f64, scale: ByteScale) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    if value >= 1_000_000.0 {
        format!("{:.2} MB", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        match scale {
            ByteScale::Rounded => format!("{} KB", (value / 1_000.0).round()),
            ByteScale::Precise => format!("{:.2} KB", value / 1_000.0),
        }
    } else {
        format!("{:.2} B", value)
    }
}

/// Share of passes in whole percent, or None when there is nothing to divide.
pub fn pass_percent(pass: u64, fail: u64) -> Option<u64> {
    let total = pass + fail;
    if total == 0 {
        return None;
    }
    Some((pass as f64 / total as f64 * 100.0).round() as u64)
}

/// `"70%"`, or `"—%"` while there are no graded projects
pub fn pass_rate(pass: u64, fail: u64) -> String {
    match pass_percent(pass, fail) {
        Some(pct) => format!("{}%", pct),
        None => format!("{}%", PLACEHOLDER),
    }
}

/// audits done / audits received; undefined without any received audits
pub fn audit_ratio(done: f64, received: f64) -> Option<f64> {
    if !done.is_finite() || !received.is_finite() || received == 0.0 {
        return None;
    }
    Some(done / received)
}

pub fn format_audit_ratio(done: f64, received: f64) -> String {
    match audit_ratio(done, received) {
        Some(ratio) => format!("{:.1}", ratio),
        None => PLACEHOLDER.to_string(),
    }
}

/// Cut a label down to `max` characters, ending in an ellipsis when shortened.
pub fn truncate_label(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
