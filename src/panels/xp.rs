use plotters::{coord::Shift, prelude::*, style::text_anchor::HPos};

use crate::{
    format::{format_bytes, ByteScale},
    geometry::{Point, Projection, XpGeometry},
};

use super::{draw_placeholder, text_style, to_backend, Panel, ACCENT_COLOR, MUTED_TEXT_COLOR, PLACEHOLDER_SIZE, TEXT_COLOR};

const NO_XP: &str = "No XP data.";
const AXIS_COLOR: RGBColor = RGBColor(0x99, 0x99, 0x99);

/// Cumulative XP over time. `total` is the summed XP shown in the corner, which can differ
/// from the top of the line when corrections with negative amounts exist.
pub struct XpPanel {
    geometry: Projection<XpGeometry>,
    total: f64,
}

impl XpPanel {
    pub fn new(geometry: Projection<XpGeometry>, total: f64) -> Self {
        XpPanel { geometry, total }
    }
}

impl Panel for XpPanel {
    fn mount(&self) -> &'static str {
        "xp-graph"
    }

    fn size(&self) -> (u32, u32) {
        self.geometry.shape().map_or(PLACEHOLDER_SIZE, |g| (g.width as u32, g.height as u32))
    }

    fn draw<DB: DrawingBackend<ErrorType: 'static>>(&self, root: &DrawingArea<DB, Shift>) -> anyhow::Result<()> {
        let Some(geo) = self.geometry.shape() else {
            return draw_placeholder(root, NO_XP);
        };

        root.draw(&PathElement::new(to_backend(&geo.x_axis), AXIS_COLOR.stroke_width(1)))?;
        root.draw(&PathElement::new(to_backend(&geo.y_axis), AXIS_COLOR.stroke_width(1)))?;

        root.draw(&PathElement::new(to_backend(&geo.line), ACCENT_COLOR.stroke_width(2)))?;
        root.draw(&Circle::new(geo.marker.to_backend(), 4, ACCENT_COLOR.filled()))?;

        let top = geo.y_axis[0].y / 2.0;
        root.draw(&Text::new("XP Progression", Point::new(geo.y_axis[0].x, top).to_backend(), text_style(16.0, &TEXT_COLOR, HPos::Left)))?;
        root.draw(&Text::new(
            format!("Total {}", format_bytes(self.total, ByteScale::Rounded)),
            Point::new(geo.x_axis[1].x, top).to_backend(),
            text_style(13.0, &MUTED_TEXT_COLOR, HPos::Right),
        ))?;
        Ok(())
    }
}
