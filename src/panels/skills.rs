use plotters::{coord::Shift, prelude::*, style::text_anchor::HPos};

use crate::{
    format::truncate_label,
    geometry::{BarGeometry, Point, Projection, RadarGeometry},
};

use super::{draw_placeholder, draw_rect, text_style, to_backend, Panel, ACCENT_COLOR, MUTED_TEXT_COLOR, PLACEHOLDER_SIZE, TEXT_COLOR, TRACK_COLOR};

const NO_SKILLS: &str = "No skills data.";
const TITLE: &str = "Skills (Technical + Technologies)";

const RING_COLOR: RGBColor = RGBColor(0xdd, 0xdd, 0xdd);
const SPOKE_COLOR: RGBColor = RGBColor(0xe0, 0xe0, 0xe0);
const AREA_COLOR: RGBColor = RGBColor(0x1a, 0x73, 0xe8);
const DOT_RADIUS: f64 = 2.5;
/// characters of a skill name shown left of a bar
const BAR_LABEL_CHARS: usize = 20;

/// The radar of every aggregated skill
pub struct RadarPanel {
    geometry: Projection<RadarGeometry>,
}

impl RadarPanel {
    pub fn new(geometry: Projection<RadarGeometry>) -> Self {
        RadarPanel { geometry }
    }
}

impl Panel for RadarPanel {
    fn mount(&self) -> &'static str {
        "skills-graph"
    }

    fn size(&self) -> (u32, u32) {
        self.geometry.shape().map_or(PLACEHOLDER_SIZE, |g| (g.size as u32, g.size as u32))
    }

    fn draw<DB: DrawingBackend<ErrorType: 'static>>(&self, root: &DrawingArea<DB, Shift>) -> anyhow::Result<()> {
        let Some(geo) = self.geometry.shape() else {
            return draw_placeholder(root, NO_SKILLS);
        };
        let center = geo.center.to_backend();

        for ring in &geo.rings {
            root.draw(&Circle::new(center, *ring, RING_COLOR.stroke_width(1)))?;
        }
        for spoke in &geo.spokes {
            root.draw(&PathElement::new(vec![center, spoke.to_backend()], SPOKE_COLOR.stroke_width(1)))?;
        }

        let outline = to_backend(&geo.points);
        root.draw(&Polygon::new(outline.clone(), AREA_COLOR.mix(0.2).filled()))?;
        let mut closed = outline.clone();
        closed.extend(outline.first().copied());
        root.draw(&PathElement::new(closed, AREA_COLOR.stroke_width(2)))?;
        for dot in &outline {
            root.draw(&Circle::new(*dot, DOT_RADIUS, AREA_COLOR.filled()))?;
        }

        for label in &geo.labels {
            // anchor labels away from the centre so they don't run over the chart
            let h_pos = if label.anchor.x > geo.center.x + 1.0 {
                HPos::Left
            } else if label.anchor.x < geo.center.x - 1.0 {
                HPos::Right
            } else {
                HPos::Center
            };
            root.draw(&Text::new(label.text.clone(), label.anchor.to_backend(), text_style(12.0, &MUTED_TEXT_COLOR, h_pos)))?;
        }

        root.draw(&Text::new(TITLE, Point::new(geo.center.x, 24.0).to_backend(), text_style(18.0, &TEXT_COLOR, HPos::Center)))?;
        Ok(())
    }
}

/// One horizontal percentage bar per skill
pub struct SkillBarsPanel {
    geometry: Projection<BarGeometry>,
}

impl SkillBarsPanel {
    pub fn new(geometry: Projection<BarGeometry>) -> Self {
        SkillBarsPanel { geometry }
    }
}

impl Panel for SkillBarsPanel {
    fn mount(&self) -> &'static str {
        "skills-bars"
    }

    fn size(&self) -> (u32, u32) {
        self.geometry.shape().map_or(PLACEHOLDER_SIZE, |g| (g.width as u32, g.height as u32))
    }

    fn draw<DB: DrawingBackend<ErrorType: 'static>>(&self, root: &DrawingArea<DB, Shift>) -> anyhow::Result<()> {
        let Some(geo) = self.geometry.shape() else {
            return draw_placeholder(root, NO_SKILLS);
        };

        for row in &geo.rows {
            let middle = row.track.y + row.track.height / 2.0;
            root.draw(&Text::new(
                truncate_label(&row.label, BAR_LABEL_CHARS),
                Point::new(row.track.x - 8.0, middle).to_backend(),
                text_style(13.0, &TEXT_COLOR, HPos::Right),
            ))?;

            draw_rect(root, &row.track, Point::default(), TRACK_COLOR.filled())?;
            if row.fill.width > 0.0 {
                draw_rect(root, &row.fill, Point::default(), ACCENT_COLOR.filled())?;
            }

            root.draw(&Text::new(
                format!("{}%", row.pct),
                Point::new(row.track.x + row.track.width - 6.0, middle).to_backend(),
                text_style(12.0, &TEXT_COLOR, HPos::Right),
            ))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        geometry::{bars, radar, BarConfig, RadarConfig},
        normalize::{Category, SkillEntry},
        panels::render_to_string,
    };

    use super::*;

    fn skills() -> Vec<SkillEntry> {
        vec![
            SkillEntry { name: "Go".to_string(), category: Category::Technology, value: 75.0 },
            SkillEntry { name: "Algorithms".to_string(), category: Category::Technical, value: 40.0 },
            SkillEntry { name: "Sql".to_string(), category: Category::Technology, value: 10.0 },
        ]
    }

    #[test]
    fn test_radar_panel() -> anyhow::Result<()> {
        let panel = RadarPanel::new(radar(&skills(), &RadarConfig::default()));
        assert_eq!(panel.size(), (680, 680));

        let svg = render_to_string(&panel)?;
        assert!(svg.contains("<polygon"));
        assert!(svg.contains("Algorithms"));
        assert!(svg.contains(TITLE));
        Ok(())
    }

    #[test]
    fn test_bars_panel() -> anyhow::Result<()> {
        let panel = SkillBarsPanel::new(bars(&skills(), &BarConfig::default()));
        assert_eq!(panel.size(), (600, 152));

        let svg = render_to_string(&panel)?;
        assert!(svg.contains("75%"));
        assert!(svg.contains("Sql"));
        Ok(())
    }

    #[test]
    fn test_no_skills() -> anyhow::Result<()> {
        let radar = RadarPanel::new(Projection::NoData);
        assert_eq!(radar.size(), PLACEHOLDER_SIZE);
        assert!(render_to_string(&radar)?.contains(NO_SKILLS));
        assert!(render_to_string(&SkillBarsPanel::new(Projection::NoData))?.contains(NO_SKILLS));
        Ok(())
    }
}
