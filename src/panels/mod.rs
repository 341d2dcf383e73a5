/*!
 * Panels are the render sink: each one owns the finished geometry for a single mount point
 * and knows how to draw it onto a plotters drawing area. Panels never compute layout
 * themselves, that all comes from `geometry`.
 *
 * A panel whose projection came back as `NoData` draws a short text placeholder instead.
 */

use std::path::{Path, PathBuf};

use anyhow::Context;
use plotters::{coord::Shift, prelude::*, style::text_anchor::{HPos, Pos, VPos}};
use tracing::debug;

use crate::geometry::{Point, Rect};

pub mod audit;
pub mod grades;
pub mod skills;
pub mod xp;

/// A chart that can be drawn at a named mount point
pub trait Panel {
    /// The mount point name, also used as the output file stem
    fn mount(&self) -> &'static str;
    /// Canvas size in pixels
    fn size(&self) -> (u32, u32);
    /// Draw onto an already-filled drawing area
    fn draw<DB: DrawingBackend<ErrorType: 'static>>(&self, root: &DrawingArea<DB, Shift>) -> anyhow::Result<()>;
}

/// Canvas size for placeholder panels
const PLACEHOLDER_SIZE: (u32, u32) = (320, 48);
/// The default font for labels
const FONT: &str = "sans-serif";

const TEXT_COLOR: RGBColor = RGBColor(0x22, 0x22, 0x22);
const MUTED_TEXT_COLOR: RGBColor = RGBColor(0x44, 0x44, 0x44);
const TRACK_COLOR: RGBColor = RGBColor(0xee, 0xee, 0xee);
const ACCENT_COLOR: RGBColor = RGBColor(0x8f, 0x7c, 0xf8);

/// Writes panels out as `<out_dir>/<mount>.svg`
pub struct SvgSink {
    out_dir: PathBuf,
}

impl SvgSink {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> anyhow::Result<Self> {
        let out_dir = out_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("could not create output directory {}", out_dir.display()))?;
        Ok(SvgSink { out_dir })
    }

    /// Render a panel to its file, returning the path written
    pub fn render<P: Panel>(&self, panel: &P) -> anyhow::Result<PathBuf> {
        let name = self.out_dir.join(format!("{}.svg", panel.mount()));
        debug!("writing {}...", name.display());

        let root = SVGBackend::new(&name, panel.size()).into_drawing_area();
        root.fill(&WHITE)?;
        panel.draw(&root)?;
        root.present().context("could not write file")?;

        Ok(name.clone())
    }
}

/// Render a panel to an in-memory SVG document
#[cfg(test)]
pub fn render_to_string<P: Panel>(panel: &P) -> anyhow::Result<String> {
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, panel.size()).into_drawing_area();
        root.fill(&WHITE)?;
        panel.draw(&root)?;
        root.present().context("could not finish svg")?;
    }
    Ok(buf)
}

/// Helper to build a text style with the given anchor
fn text_style<'a>(size: f64, color: &RGBColor, h_pos: HPos) -> TextStyle<'a> {
    (FONT, size).into_font().color(color).pos(Pos::new(h_pos, VPos::Center))
}

/// Draw the "nothing to show" message
fn draw_placeholder<DB: DrawingBackend<ErrorType: 'static>>(root: &DrawingArea<DB, Shift>, message: &str) -> anyhow::Result<()> {
    root.draw(&Text::new(message.to_string(), (10, PLACEHOLDER_SIZE.1 as i32 / 2), text_style(14.0, &MUTED_TEXT_COLOR, HPos::Left)))?;
    Ok(())
}

/// draw a rectangle shifted by `offset`
fn draw_rect<DB: DrawingBackend<ErrorType: 'static>>(root: &DrawingArea<DB, Shift>, rect: &Rect, offset: Point, style: ShapeStyle) -> anyhow::Result<()> {
    let moved = Rect::new(rect.x + offset.x, rect.y + offset.y, rect.width, rect.height);
    root.draw(&Rectangle::new(moved.corners(), style))?;
    Ok(())
}

fn to_backend(points: &[Point]) -> Vec<(i32, i32)> {
    points.iter().map(|p| p.to_backend()).collect()
}
