use plotters::{coord::Shift, prelude::*, style::text_anchor::HPos};

use crate::{
    format::pass_rate,
    geometry::{split_bar, Point, Projection, SplitBar},
    stats::GradeCounts,
};

use super::{draw_placeholder, draw_rect, text_style, Panel, MUTED_TEXT_COLOR, PLACEHOLDER_SIZE};

const NO_GRADES: &str = "No grades yet.";
const BAR_WIDTH: f64 = 520.0;
const BAR_HEIGHT: f64 = 28.0;
/// room under the bar for the caption
const CAPTION_HEIGHT: f64 = 28.0;

const PASS_COLOR: RGBColor = RGBColor(0x2e, 0xcc, 0x71);
const FAIL_COLOR: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);

/// Passed vs failed projects as one split bar
pub struct GradesPanel {
    counts: GradeCounts,
    geometry: Projection<SplitBar>,
}

impl GradesPanel {
    pub fn new(counts: GradeCounts) -> Self {
        GradesPanel { counts, geometry: split_bar(counts.pass, counts.fail, BAR_WIDTH, BAR_HEIGHT) }
    }
}

impl Panel for GradesPanel {
    fn mount(&self) -> &'static str {
        "grades-graph"
    }

    fn size(&self) -> (u32, u32) {
        match self.geometry {
            Projection::Shape(_) => (BAR_WIDTH as u32, (BAR_HEIGHT + CAPTION_HEIGHT) as u32),
            Projection::NoData => PLACEHOLDER_SIZE,
        }
    }

    fn draw<DB: DrawingBackend<ErrorType: 'static>>(&self, root: &DrawingArea<DB, Shift>) -> anyhow::Result<()> {
        let Some(bar) = self.geometry.shape() else {
            return draw_placeholder(root, NO_GRADES);
        };

        if bar.pass.width > 0.0 {
            draw_rect(root, &bar.pass, Point::default(), PASS_COLOR.filled())?;
        }
        if bar.fail.width > 0.0 {
            draw_rect(root, &bar.fail, Point::default(), FAIL_COLOR.filled())?;
        }

        let caption = format!("{} passed, {} failed ({} pass rate)", self.counts.pass, self.counts.fail, pass_rate(self.counts.pass, self.counts.fail));
        root.draw(&Text::new(caption, Point::new(0.0, BAR_HEIGHT + CAPTION_HEIGHT / 2.0).to_backend(), text_style(13.0, &MUTED_TEXT_COLOR, HPos::Left)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::panels::render_to_string;

    use super::*;

    #[test]
    fn test_grades_panel() -> anyhow::Result<()> {
        let panel = GradesPanel::new(GradeCounts { pass: 7, fail: 3 });
        assert_eq!(panel.size(), (520, 56));
        let svg = render_to_string(&panel)?;
        assert!(svg.contains("7 passed, 3 failed (70% pass rate)"));
        Ok(())
    }

    #[test]
    fn test_no_grades() -> anyhow::Result<()> {
        let panel = GradesPanel::new(GradeCounts::default());
        assert_eq!(panel.size(), PLACEHOLDER_SIZE);
        assert!(render_to_string(&panel)?.contains(NO_GRADES));
        Ok(())
    }
}
