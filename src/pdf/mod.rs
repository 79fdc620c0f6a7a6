//! Page form: the [`PageSurface`] drawing capability, its PDF implementation
//! and the adapter that draws a composed [`Layout`] onto it.

mod canvas;

pub use canvas::PdfCanvas;

use crate::error::Error;
use crate::images;
use crate::layout::{
    CELL_PADDING, CellRect, HAlign, Layout, PAGE_HEIGHT, PAGE_MARGIN, PAGE_WIDTH, RegionContent,
    Style, TextMeasure, VAlign, Weighted, wrap_lines,
};

/// Regular cell borders, in points.
pub const BORDER_WIDTH: f32 = 0.5;
/// Right edge of the last column.
pub const PAGE_EDGE_BORDER_WIDTH: f32 = 1.5;

/// Baseline offset below the top of a line box, as a fraction of the font size.
const BASELINE_RATIO: f32 = 0.8;

/// What happens to rows that run past the bottom margin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageOverflow {
    /// Keep drawing below the margin on the same page.
    #[default]
    Overlap,
    /// Start a new page before a block of rows that would cross the bottom
    /// margin. Blocks are delimited by rows no region spans across.
    Paginate,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    pub fn a4_landscape() -> Self {
        Self {
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
            margin: PAGE_MARGIN,
        }
    }

    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub bold: bool,
    pub color: [u8; 3],
}

/// Absolute-coordinate drawing surface. Coordinates are points with the
/// origin at the top-left corner of the page; `y` grows downwards.
pub trait PageSurface {
    fn geometry(&self) -> PageGeometry;

    /// Starts a new page; later drawing goes there.
    fn add_page(&mut self);

    /// Solid fill, no outline. Borders go through `draw_line`.
    fn draw_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: [u8; 3]);

    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32);

    fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle);

    fn draw_image(&mut self, data: &[u8], x: f32, y: f32, w: f32, h: f32) -> Result<(), Error>;
}

/// Where one layout row landed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowSlot {
    pub page: usize,
    pub top: f32,
}

/// Assigns every layout row a page and a top offset.
pub fn place_rows(layout: &Layout, geometry: &PageGeometry, overflow: PageOverflow) -> Vec<RowSlot> {
    let heights = &layout.row_heights;
    let mut slots = Vec::with_capacity(heights.len());
    let mut page = 0;
    let mut y = geometry.margin;
    for row in 0..heights.len() {
        if overflow == PageOverflow::Paginate && y > geometry.margin && layout.is_breakable_before(row) {
            let block_end = (row + 1..heights.len())
                .find(|&r| layout.is_breakable_before(r))
                .unwrap_or(heights.len());
            let block: f32 = heights[row..block_end].iter().sum();
            if y + block > geometry.content_bottom() {
                page += 1;
                y = geometry.margin;
            }
        }
        slots.push(RowSlot { page, top: y });
        y += heights[row];
    }
    slots
}

struct Frame<'l> {
    layout: &'l Layout<'l>,
    slots: Vec<RowSlot>,
    col_x: Vec<f32>,
}

impl Frame<'_> {
    fn page_of(&self, rect: &CellRect) -> usize {
        self.slots[rect.rows.start].page
    }

    /// Region rectangle in points: (x, y, w, h).
    fn bounds(&self, rect: &CellRect) -> (f32, f32, f32, f32) {
        let x = self.col_x[rect.cols.start];
        let w: f32 = self.layout.column_widths[rect.cols.start..=rect.cols.end].iter().sum();
        let y = self.slots[rect.rows.start].top;
        let h: f32 = self.layout.row_heights[rect.rows.start..=rect.rows.end].iter().sum();
        (x, y, w, h)
    }
}

/// Draws `layout` onto `surface` page by page and returns the page count.
/// Image failures are logged and leave their slot blank.
pub fn render_to_page<S: PageSurface + ?Sized>(
    layout: &Layout,
    surface: &mut S,
    measure: &dyn TextMeasure,
    overflow: PageOverflow,
) -> usize {
    let geometry = surface.geometry();
    let slots = place_rows(layout, &geometry, overflow);
    let pages = slots.last().map_or(1, |s| s.page + 1);
    let mut col_x = Vec::with_capacity(layout.columns());
    let mut x = geometry.margin;
    for w in &layout.column_widths {
        col_x.push(x);
        x += w;
    }
    let frame = Frame { layout, slots, col_x };

    for page in 0..pages {
        surface.add_page();
        let on_page = layout
            .regions
            .iter()
            .filter(|r| frame.page_of(&r.rect) == page);
        for region in on_page {
            let (x, y, w, h) = frame.bounds(&region.rect);
            match &region.content {
                RegionContent::Text { text, style } => {
                    draw_text_region(surface, measure, text, *style, (x, y, w, h));
                }
                RegionContent::Image { data } => draw_image_region(surface, data, (x, y, w, h)),
                RegionContent::Decoration(_) => {}
            }
        }
        draw_borders(surface, &frame, page);
    }
    pages
}

fn draw_text_region<S: PageSurface + ?Sized>(
    surface: &mut S,
    measure: &dyn TextMeasure,
    text: &str,
    style: Style,
    (x, y, w, h): (f32, f32, f32, f32),
) {
    let spec = style.spec();
    if let Some(fill) = spec.fill {
        surface.draw_rect(x, y, w, h, fill);
    }
    if text.trim().is_empty() {
        return;
    }

    let inner_w = (w - 2.0 * CELL_PADDING).max(1.0);
    let line_h = spec.line_height();
    let measure = Weighted {
        inner: measure,
        bold: spec.bold,
    };
    let mut lines = wrap_lines(&measure, text, inner_w, spec.font_size);
    let max_lines = (((h - 2.0 * CELL_PADDING) / line_h).floor() as usize).max(1);
    if lines.len() > max_lines {
        log::debug!("text clipped to {max_lines} of {} lines: {text:?}", lines.len());
        lines.truncate(max_lines);
    }

    let block_h = lines.len() as f32 * line_h;
    let mut top = match spec.v_align {
        VAlign::Top => y + CELL_PADDING,
        VAlign::Center => y + (h - block_h) / 2.0,
    };
    let text_style = TextStyle {
        font_size: spec.font_size,
        bold: spec.bold,
        color: spec.color,
    };
    for line in &lines {
        let line_x = match spec.h_align {
            HAlign::Left => x + CELL_PADDING,
            HAlign::Center => x + (w - measure.text_width(line, spec.font_size)) / 2.0,
        };
        let baseline = top + (line_h - spec.font_size) / 2.0 + spec.font_size * BASELINE_RATIO;
        surface.draw_text(line, line_x, baseline, &text_style);
        top += line_h;
    }
}

/// Fits the picture inside the padded region, keeping its aspect ratio.
fn draw_image_region<S: PageSurface + ?Sized>(
    surface: &mut S,
    data: &[u8],
    (x, y, w, h): (f32, f32, f32, f32),
) {
    let Some(info) = images::sniff(data) else {
        log::warn!("Skipping image of {} bytes: unrecognised format", data.len());
        return;
    };
    let box_w = (w - 2.0 * CELL_PADDING).max(1.0);
    let box_h = (h - 2.0 * CELL_PADDING).max(1.0);
    let aspect = info.aspect();
    let (draw_w, draw_h) = if box_w / box_h > aspect {
        (box_h * aspect, box_h)
    } else {
        (box_w, box_w / aspect)
    };
    let dx = x + (w - draw_w) / 2.0;
    let dy = y + (h - draw_h) / 2.0;
    if let Err(e) = surface.draw_image(data, dx, dy, draw_w, draw_h) {
        log::warn!("Skipping {:?} image: {e}", info.format);
    }
}

/// Strokes the edges of bordered cells that lie on the outline of the region
/// owning them, so merged cells read as one box.
fn draw_borders<S: PageSurface + ?Sized>(surface: &mut S, frame: &Frame, page: usize) {
    let layout = frame.layout;
    let owners = layout.owner_grid();
    let columns = layout.columns();
    for border in &layout.borders {
        let slot = frame.slots[border.row];
        if slot.page != page {
            continue;
        }
        let x0 = frame.col_x[border.col];
        let x1 = x0 + layout.column_widths[border.col];
        let y0 = slot.top;
        let y1 = y0 + layout.row_heights[border.row];

        let rect = owners[border.row * columns + border.col].map(|idx| layout.regions[idx].rect);
        let (top, bottom, left, right) = match rect {
            Some(r) => (
                border.row == r.rows.start,
                border.row == r.rows.end,
                border.col == r.cols.start,
                border.col == r.cols.end,
            ),
            None => (true, true, true, true),
        };
        if top {
            surface.draw_line(x0, y0, x1, y0, BORDER_WIDTH);
        }
        if bottom {
            surface.draw_line(x0, y1, x1, y1, BORDER_WIDTH);
        }
        if left {
            surface.draw_line(x0, y0, x0, y1, BORDER_WIDTH);
        }
        if right || border.page_edge {
            let width = if border.page_edge {
                PAGE_EDGE_BORDER_WIDTH
            } else {
                BORDER_WIDTH
            };
            surface.draw_line(x1, y0, x1, y1, width);
        }
    }
}
