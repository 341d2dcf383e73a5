/*!
 * Pure chart geometry: everything here maps data onto pixel coordinates for a given
 * canvas size, with the origin in the top-left corner. Nothing draws; the panels take
 * these shapes and hand them to the SVG backend.
 *
 * Every projection is total. Empty or degenerate input comes back as `Projection::NoData`
 * so the caller can draw a placeholder instead.
 */

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use clap::ValueEnum;

use crate::{format::truncate_label, normalize::SkillEntry, xp::CumulativePoint};

/// A point in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// `center + r·(cos θ, sin θ)`
    pub fn polar(center: Point, radius: f64, angle: f64) -> Self {
        Point::new(center.x + angle.cos() * radius, center.y + angle.sin() * radius)
    }

    /// rounded to the integer coordinates plotters backends work in
    pub fn to_backend(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    /// top-left and bottom-right corners, in backend coordinates
    pub fn corners(&self) -> [(i32, i32); 2] {
        [Point::new(self.x, self.y).to_backend(), Point::new(self.x + self.width, self.y + self.height).to_backend()]
    }
}

/// The result of a projection: either there is nothing to draw, or a shape
#[derive(Debug, Clone, PartialEq)]
pub enum Projection<T> {
    NoData,
    Shape(T),
}

impl<T> Projection<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Projection::NoData)
    }

    pub fn shape(&self) -> Option<&T> {
        match self {
            Projection::Shape(s) => Some(s),
            Projection::NoData => None,
        }
    }
}

// ======= radar

#[derive(Debug, Clone)]
pub struct RadarConfig {
    /// smallest outer radius
    pub min_radius: f64,
    /// the radius grows with the number of spokes so labels don't collide
    pub radius_per_skill: f64,
    /// space around the outer ring for labels and the title
    pub padding: f64,
    pub rings: usize,
    pub label_offset: f64,
    pub label_chars: usize,
}

impl Default for RadarConfig {
    fn default() -> Self {
        RadarConfig { min_radius: 220.0, radius_per_skill: 7.0, padding: 240.0, rings: 5, label_offset: 16.0, label_chars: 18 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarLabel {
    pub anchor: Point,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarGeometry {
    /// side of the square canvas
    pub size: f64,
    pub center: Point,
    pub radius: f64,
    /// reference ring radii, innermost first
    pub rings: Vec<f64>,
    /// outer end of each spoke; spokes start at `center`
    pub spokes: Vec<Point>,
    /// the closed data polygon, one vertex per skill
    pub points: Vec<Point>,
    pub labels: Vec<RadarLabel>,
}

/// Spoke `i` of `n`, starting at 12 o'clock and going clockwise.
pub fn spoke_angle(i: usize, n: usize) -> f64 {
    TAU * i as f64 / n as f64 - FRAC_PI_2
}

/// Project ranked skills onto a radar chart.
pub fn radar(skills: &[SkillEntry], config: &RadarConfig) -> Projection<RadarGeometry> {
    let data: Vec<&SkillEntry> = skills.iter().filter(|s| !s.name.is_empty() && s.value.is_finite()).collect();
    if data.is_empty() {
        return Projection::NoData;
    }

    let count = data.len();
    let max_value = data.iter().map(|s| s.value).fold(f64::MIN, f64::max);
    let max_value = if max_value > 0.0 { max_value } else { 1.0 };

    let radius = config.min_radius.max(count as f64 * config.radius_per_skill);
    let size = radius * 2.0 + config.padding;
    let center = Point::new(size / 2.0, size / 2.0);

    let rings = (1..=config.rings).map(|j| radius * j as f64 / config.rings as f64).collect();

    let spokes = (0..count).map(|i| Point::polar(center, radius, spoke_angle(i, count))).collect();

    let points = data.iter().enumerate()
        .map(|(i, s)| Point::polar(center, s.value / max_value * radius, spoke_angle(i, count)))
        .collect();

    let labels = data.iter().enumerate().map(|(i, s)| RadarLabel {
        anchor: Point::polar(center, radius + config.label_offset, spoke_angle(i, count)),
        text: truncate_label(&s.name, config.label_chars),
    }).collect();

    Projection::Shape(RadarGeometry { size, center, radius, rings, spokes, points, labels })
}

// ======= horizontal bars

#[derive(Debug, Clone)]
pub struct BarConfig {
    pub width: f64,
    /// the label column left of the bars
    pub label_width: f64,
    pub row_height: f64,
    pub gap: f64,
    pub top: f64,
    /// extra height added below the last row
    pub bottom: f64,
}

impl Default for BarConfig {
    fn default() -> Self {
        BarConfig { width: 600.0, label_width: 160.0, row_height: 28.0, gap: 12.0, top: 10.0, bottom: 22.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarRow {
    pub label: String,
    /// value clamped to a whole percentage
    pub pct: u32,
    pub track: Rect,
    pub fill: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarGeometry {
    pub width: f64,
    pub height: f64,
    pub rows: Vec<BarRow>,
}

/// `clamp(round(value), 0, 100)`
pub fn clamp_percent(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u32
}

/// One bar per skill, stacked top to bottom.
pub fn bars(skills: &[SkillEntry], config: &BarConfig) -> Projection<BarGeometry> {
    if skills.is_empty() {
        return Projection::NoData;
    }

    let track_width = config.width - config.label_width;
    let pitch = config.row_height + config.gap;
    let rows = skills.iter().enumerate().map(|(i, s)| {
        let pct = clamp_percent(s.value);
        let y = config.top + i as f64 * pitch;
        let fill_width = (pct as f64 / 100.0 * track_width).round();
        BarRow {
            label: s.name.clone(),
            pct,
            track: Rect::new(config.label_width, y, track_width, config.row_height),
            fill: Rect::new(config.label_width, y, fill_width, config.row_height),
        }
    }).collect();

    let height = config.top + skills.len() as f64 * pitch + config.bottom;
    Projection::Shape(BarGeometry { width: config.width, height, rows })
}

// ======= cumulative XP line

#[derive(Debug, Clone)]
pub struct XpConfig {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for XpConfig {
    fn default() -> Self {
        XpConfig { width: 1280.0, height: 360.0, padding: 40.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XpGeometry {
    pub width: f64,
    pub height: f64,
    pub line: Vec<Point>,
    /// the last point of the line
    pub marker: Point,
    pub x_axis: [Point; 2],
    pub y_axis: [Point; 2],
}

/// Map a cumulative series onto a polyline: time runs left to right, value bottom to top.
pub fn xp_line(series: &[CumulativePoint], config: &XpConfig) -> Projection<XpGeometry> {
    if series.is_empty() {
        return Projection::NoData;
    }

    let times: Vec<f64> = series.iter().map(|p| p.date.timestamp_millis() as f64).collect();
    let min_x = times.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if max_x - min_x > 0.0 { max_x - min_x } else { 1.0 };

    let max_y = series.iter().map(|p| p.total).fold(f64::MIN, f64::max);
    let max_y = if max_y > 0.0 { max_y } else { 1.0 };

    let pad = config.padding;
    let inner_w = config.width - pad * 2.0;
    let inner_h = config.height - pad * 2.0;
    let scale = |t: f64, total: f64| Point::new(
        pad + (t - min_x) / span * inner_w,
        config.height - pad - total / max_y * inner_h,
    );

    let line: Vec<Point> = times.iter().zip(series).map(|(t, p)| scale(*t, p.total)).collect();
    let marker = *line.last().unwrap_or(&Point::default());
    let bottom = config.height - pad;

    Projection::Shape(XpGeometry {
        width: config.width,
        height: config.height,
        line,
        marker,
        x_axis: [Point::new(pad, bottom), Point::new(config.width - pad, bottom)],
        y_axis: [Point::new(pad, pad), Point::new(pad, bottom)],
    })
}

// ======= gauge

/// What the gauge shows when there is no usable ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UnauditedPolicy {
    /// a thin arc at the fallback ratio, so the gauge is never blank
    #[default]
    Sliver,
    /// no gauge at all, the panel shows its placeholder
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct GaugeConfig {
    pub size: f64,
    pub stroke: f64,
    /// fraction of the full circle the track covers
    pub sweep_fraction: f64,
    /// angle the gap is centred on; -π/2 is 12 o'clock
    pub gap_center: f64,
    /// ratio drawn when the real one is zero, negative or not a number
    pub fallback_ratio: f64,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        GaugeConfig { size: 200.0, stroke: 12.0, sweep_fraction: 0.75, gap_center: -FRAC_PI_2, fallback_ratio: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeGeometry {
    pub size: f64,
    pub center: Point,
    pub radius: f64,
    pub stroke: f64,
    pub circumference: f64,
    /// arc length of the background track
    pub track_length: f64,
    /// arc length of the filled part
    pub progress_length: f64,
    /// dash offset that puts the start of both arcs just after the gap when stroked as a circle
    pub dash_offset: f64,
    pub pct: u32,
    /// the ratio that was drawn (the fallback one if `fallback` is set)
    pub ratio: f64,
    pub fallback: bool,
    pub label: String,
    pub ticks: Vec<[Point; 2]>,
}

impl GaugeGeometry {
    /// Where both arcs start, in `[0, 2π)` clockwise from 3 o'clock, recovered from the dash offset.
    pub fn start_angle(&self) -> f64 {
        (TAU * (1.0 - self.dash_offset / self.circumference)).rem_euclid(TAU)
    }

    /// Sample an arc of the given length from the start angle, about every 2 degrees.
    pub fn arc_points(&self, length: f64) -> Vec<Point> {
        let sweep = length / self.radius;
        let start = self.start_angle();
        let segments = ((sweep / (PI / 90.0)).ceil() as usize).max(1);
        (0..=segments)
            .map(|i| Point::polar(self.center, self.radius, start + sweep * i as f64 / segments as f64))
            .collect()
    }
}

/// Project an audit ratio onto a partial-circle gauge.
pub fn gauge(ratio: Option<f64>, policy: UnauditedPolicy, config: &GaugeConfig) -> Projection<GaugeGeometry> {
    let (ratio, fallback) = match ratio.filter(|r| r.is_finite() && *r > 0.0) {
        Some(r) => (r, false),
        None => match policy {
            UnauditedPolicy::Sliver => (config.fallback_ratio, true),
            UnauditedPolicy::Placeholder => return Projection::NoData,
        },
    };

    let pct = clamp_percent(ratio * 100.0);
    let radius = (config.size - config.stroke) / 2.0;
    let center = Point::new(config.size / 2.0, config.size / 2.0);
    let circumference = TAU * radius;
    let fraction = config.sweep_fraction.clamp(0.0, 1.0);
    let track_length = circumference * fraction;
    let progress_length = track_length * pct as f64 / 100.0;

    let gap = TAU * (1.0 - fraction);
    let start_angle = (config.gap_center + gap / 2.0).rem_euclid(TAU);
    let dash_offset = circumference * (TAU - start_angle) / TAU;

    let tick = |angle: f64, inner: f64, outer: f64| [Point::polar(center, inner, angle), Point::polar(center, outer, angle)];
    let ticks = vec![
        tick(config.gap_center, radius, radius + 10.0),
        tick(FRAC_PI_2 - PI / 4.0, radius * 0.99, radius * 1.1),
        tick(FRAC_PI_2 + PI / 4.0, radius * 0.99, radius * 1.1),
    ];

    Projection::Shape(GaugeGeometry {
        size: config.size,
        center,
        radius,
        stroke: config.stroke,
        circumference,
        track_length,
        progress_length,
        dash_offset,
        pct,
        ratio,
        fallback,
        label: format!("{:.1}", ratio),
        ticks,
    })
}

// ======= pass/fail split bar and audit level bars

#[derive(Debug, Clone, PartialEq)]
pub struct SplitBar {
    pub pass: Rect,
    pub fail: Rect,
}

/// Pass share on the left, fail share on the right, filling `width`.
pub fn split_bar(pass: u64, fail: u64, width: f64, height: f64) -> Projection<SplitBar> {
    let total = pass + fail;
    if total == 0 {
        return Projection::NoData;
    }
    let pass_width = (pass as f64 / total as f64 * width).round();
    Projection::Shape(SplitBar {
        pass: Rect::new(0.0, 0.0, pass_width, height),
        fail: Rect::new(pass_width, 0.0, width - pass_width, height),
    })
}

/// Bar lengths for a set of values, relative to the largest one.
pub fn level_bars(values: &[f64], width: f64, height: f64) -> Vec<Rect> {
    let clean: Vec<f64> = values.iter().map(|v| if v.is_finite() { v.max(0.0) } else { 0.0 }).collect();
    let max = clean.iter().copied().fold(0.0, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    clean.iter().map(|v| Rect::new(0.0, 0.0, (v / max * width).round(), height)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::normalize::Category;

    use super::*;

    fn skill(name: &str, value: f64) -> SkillEntry {
        SkillEntry { name: name.to_string(), category: Category::Unknown, value }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_radar_empty() {
        assert!(radar(&[], &RadarConfig::default()).is_no_data());
        assert!(radar(&[skill("x", f64::NAN)], &RadarConfig::default()).is_no_data());
    }

    #[test]
    fn test_radar_layout() {
        let skills = vec![skill("Go", 80.0), skill("Sql", 40.0), skill("Js", 0.0), skill("Css", 20.0)];
        let geo = radar(&skills, &RadarConfig::default());
        let geo = geo.shape().unwrap();

        assert_eq!(geo.radius, 220.0);
        assert_eq!(geo.size, 680.0);
        assert_eq!(geo.rings, vec![44.0, 88.0, 132.0, 176.0, 220.0]);
        assert_eq!(geo.spokes.len(), 4);

        // first point straight up at full radius
        assert!(close(geo.points[0].x, 340.0) && close(geo.points[0].y, 120.0));
        // second is at 3 o'clock, half the radius
        assert!(close(geo.points[1].x, 450.0) && close(geo.points[1].y, 340.0));
        // zero value collapses onto the center
        assert!(close(geo.points[2].x, 340.0) && close(geo.points[2].y, 340.0));
        assert_eq!(geo.labels[0].text, "Go");
    }

    #[test]
    fn test_radar_all_zero_uses_unit_max() {
        let geo = radar(&[skill("a", 0.0), skill("b", 0.0)], &RadarConfig::default());
        let geo = geo.shape().unwrap();
        assert!(geo.points.iter().all(|p| close(p.x, geo.center.x) && close(p.y, geo.center.y)));
    }

    #[test]
    fn test_radar_grows_with_count() {
        let skills: Vec<SkillEntry> = (0..40).map(|i| skill(&format!("s{}", i), 1.0)).collect();
        let geo = radar(&skills, &RadarConfig::default());
        assert_eq!(geo.shape().unwrap().radius, 280.0);
    }

    #[test]
    fn test_bars() {
        let geo = bars(&[skill("Go", 75.4), skill("Sql", 140.0), skill("Js", -3.0)], &BarConfig::default());
        let geo = geo.shape().unwrap();
        assert_eq!(geo.height, 10.0 + 3.0 * 40.0 + 22.0);
        assert_eq!(geo.rows.iter().map(|r| r.pct).collect::<Vec<_>>(), vec![75, 100, 0]);
        assert_eq!(geo.rows[0].fill.width, 330.0);
        assert_eq!(geo.rows[1].fill.width, 440.0);
        assert_eq!(geo.rows[2].fill.width, 0.0);
        assert_eq!(geo.rows[1].track.y, 50.0);
        assert!(bars(&[], &BarConfig::default()).is_no_data());
    }

    #[test]
    fn test_xp_line() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let series = vec![
            CumulativePoint { date: start, total: 100.0 },
            CumulativePoint { date: start + Duration::days(10), total: 300.0 },
            CumulativePoint { date: start + Duration::days(20), total: 400.0 },
        ];
        let geo = xp_line(&series, &XpConfig::default());
        let geo = geo.shape().unwrap();

        assert_eq!(geo.line[0], Point::new(40.0, 320.0 - 70.0));
        assert_eq!(geo.line[1], Point::new(640.0, 320.0 - 210.0));
        assert_eq!(geo.marker, Point::new(1240.0, 40.0));
    }

    #[test]
    fn test_xp_line_degenerate() {
        assert!(xp_line(&[], &XpConfig::default()).is_no_data());

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let geo = xp_line(&[CumulativePoint { date: start, total: 0.0 }], &XpConfig::default());
        let geo = geo.shape().unwrap();
        assert_eq!(geo.marker, Point::new(40.0, 320.0));
    }

    #[test]
    fn test_gauge_fallback() {
        let config = GaugeConfig::default();
        let zero = gauge(Some(0.0), UnauditedPolicy::Sliver, &config);
        let zero = zero.shape().unwrap();
        assert!(zero.fallback);
        assert!(zero.progress_length > 0.0);
        assert_eq!(zero.pct, 10);

        for bad in [Some(f64::NAN), Some(-2.0), Some(f64::INFINITY), None] {
            let geo = gauge(bad, UnauditedPolicy::Sliver, &config);
            assert_eq!(geo.shape().unwrap().progress_length, zero.progress_length);
        }

        assert!(gauge(Some(0.0), UnauditedPolicy::Placeholder, &config).is_no_data());
        assert!(!gauge(Some(0.5), UnauditedPolicy::Placeholder, &config).is_no_data());
    }

    #[test]
    fn test_gauge_arc() {
        let geo = gauge(Some(1.3), UnauditedPolicy::Sliver, &GaugeConfig::default());
        let geo = geo.shape().unwrap();

        assert_eq!(geo.radius, 94.0);
        assert_eq!(geo.pct, 100);
        assert!(close(geo.track_length, geo.circumference * 0.75));
        assert!(close(geo.progress_length, geo.track_length));
        assert!(close(geo.dash_offset, geo.circumference * 0.125));
        assert!(close(geo.start_angle(), 1.75 * PI));
        assert_eq!(geo.label, "1.3");

        let arc = geo.arc_points(geo.track_length);
        // the track ends at upper-left, the gap is centred at the top
        let end = arc.last().unwrap();
        assert!(end.x < geo.center.x && end.y < geo.center.y);
    }

    #[test]
    fn test_gauge_arc_follows_lengths() {
        let geo = gauge(Some(0.5), UnauditedPolicy::Sliver, &GaugeConfig::default());
        let geo = geo.shape().unwrap();
        assert_eq!(geo.pct, 50);

        // both arcs start just right of the gap, at 1.75π
        let track = geo.arc_points(geo.track_length);
        let progress = geo.arc_points(geo.progress_length);
        let start = Point::polar(geo.center, geo.radius, 1.75 * PI);
        assert!(close(track[0].x, start.x) && close(track[0].y, start.y));
        assert!(close(progress[0].x, start.x) && close(progress[0].y, start.y));

        // half of a 270° track ends 135° further on, at 0.5π (6 o'clock)
        let end = progress.last().unwrap();
        let expected = Point::polar(geo.center, geo.radius, 0.5 * PI);
        assert!((end.x - expected.x).abs() < 1e-6 && (end.y - expected.y).abs() < 1e-6);
    }

    #[test]
    fn test_split_bar() {
        let bar = split_bar(7, 3, 520.0, 28.0);
        let bar = bar.shape().unwrap();
        assert_eq!(bar.pass.width, 364.0);
        assert_eq!(bar.fail.x, 364.0);
        assert_eq!(bar.fail.width, 156.0);
        assert!(split_bar(0, 0, 520.0, 28.0).is_no_data());
    }

    #[test]
    fn test_level_bars() {
        let rects = level_bars(&[2_000.0, 1_000.0], 220.0, 4.0);
        assert_eq!(rects[0].width, 220.0);
        assert_eq!(rects[1].width, 110.0);

        let rects = level_bars(&[0.0, f64::NAN], 220.0, 4.0);
        assert!(rects.iter().all(|r| r.width == 0.0));
    }
}
