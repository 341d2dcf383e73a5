use plotters::{coord::Shift, prelude::*, style::text_anchor::HPos};

use crate::{
    format::{format_bytes, ByteScale},
    geometry::{level_bars, GaugeGeometry, Point, Projection, Rect},
    stats::AuditTotals,
};

use super::{draw_placeholder, draw_rect, text_style, to_backend, Panel, ACCENT_COLOR, MUTED_TEXT_COLOR, PLACEHOLDER_SIZE, TEXT_COLOR, TRACK_COLOR};

const NO_RATIO: &str = "No audit ratio.";
const TICK_COLOR: RGBColor = RGBColor(0xbb, 0xbb, 0xbb);

const BARS_SIZE: (u32, u32) = (320, 76);
const LEVEL_WIDTH: f64 = 220.0;
const LEVEL_HEIGHT: f64 = 4.0;
/// vertical distance between the done and received rows
const ROW_PITCH: f64 = 36.0;

/// The audit ratio as a partial-circle gauge
pub struct AuditGaugePanel {
    geometry: Projection<GaugeGeometry>,
}

impl AuditGaugePanel {
    pub fn new(geometry: Projection<GaugeGeometry>) -> Self {
        AuditGaugePanel { geometry }
    }
}

impl Panel for AuditGaugePanel {
    fn mount(&self) -> &'static str {
        "audit-graph"
    }

    fn size(&self) -> (u32, u32) {
        self.geometry.shape().map_or(PLACEHOLDER_SIZE, |g| (g.size as u32, g.size as u32))
    }

    fn draw<DB: DrawingBackend<ErrorType: 'static>>(&self, root: &DrawingArea<DB, Shift>) -> anyhow::Result<()> {
        let Some(geo) = self.geometry.shape() else {
            return draw_placeholder(root, NO_RATIO);
        };
        let stroke = geo.stroke.round() as u32;

        root.draw(&PathElement::new(to_backend(&geo.arc_points(geo.track_length)), TRACK_COLOR.stroke_width(stroke)))?;
        if geo.progress_length > 0.0 {
            // a fallback ratio only ever shows as a faint sliver
            let color = if geo.fallback { ACCENT_COLOR.mix(0.4) } else { ACCENT_COLOR.to_rgba() };
            root.draw(&PathElement::new(to_backend(&geo.arc_points(geo.progress_length)), color.stroke_width(stroke)))?;
        }

        for tick in &geo.ticks {
            root.draw(&PathElement::new(to_backend(tick), TICK_COLOR.stroke_width(2)))?;
        }

        root.draw(&Text::new(geo.label.clone(), geo.center.to_backend(), text_style(36.0, &TEXT_COLOR, HPos::Center)))?;
        root.draw(&Text::new(
            "RATIO BOOST",
            Point::new(geo.center.x, geo.center.y + 30.0).to_backend(),
            text_style(11.0, &MUTED_TEXT_COLOR, HPos::Center),
        ))?;
        Ok(())
    }
}

/// Audits done vs received, each as a thin bar relative to the larger.
/// `None` means the totals couldn't be fetched.
pub struct AuditBarsPanel {
    audits: Option<AuditTotals>,
}

impl AuditBarsPanel {
    pub fn new(audits: Option<AuditTotals>) -> Self {
        AuditBarsPanel { audits }
    }
}

impl Panel for AuditBarsPanel {
    fn mount(&self) -> &'static str {
        "audit-bars"
    }

    fn size(&self) -> (u32, u32) {
        self.audits.map_or(PLACEHOLDER_SIZE, |_| BARS_SIZE)
    }

    fn draw<DB: DrawingBackend<ErrorType: 'static>>(&self, root: &DrawingArea<DB, Shift>) -> anyhow::Result<()> {
        let Some(audits) = self.audits else {
            return draw_placeholder(root, NO_RATIO);
        };
        let values = [audits.done, audits.received];
        let bars = level_bars(&values, LEVEL_WIDTH, LEVEL_HEIGHT);

        for (i, ((name, value), bar)) in ["Done", "Received"].iter().zip(values).zip(&bars).enumerate() {
            let top = 12.0 + i as f64 * ROW_PITCH;
            root.draw(&Text::new(*name, Point::new(0.0, top).to_backend(), text_style(13.0, &TEXT_COLOR, HPos::Left)))?;
            root.draw(&Text::new(
                format_bytes(value, ByteScale::Precise),
                Point::new(BARS_SIZE.0 as f64, top).to_backend(),
                text_style(13.0, &MUTED_TEXT_COLOR, HPos::Right),
            ))?;

            let offset = Point::new(0.0, top + 12.0);
            draw_rect(root, &Rect::new(0.0, 0.0, LEVEL_WIDTH, LEVEL_HEIGHT), offset, TRACK_COLOR.filled())?;
            if bar.width > 0.0 {
                draw_rect(root, bar, offset, ACCENT_COLOR.filled())?;
            }
        }
        Ok(())
    }
}
