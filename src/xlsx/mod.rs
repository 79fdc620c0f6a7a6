//! Grid form: the [`GridSurface`] capability, an Office Open XML workbook
//! implementing it and the adapter that writes a composed [`Layout`] into it.

mod styles;
mod workbook;

pub use workbook::XlsxWorkbook;

use crate::error::Error;
use crate::layout::{Layout, RegionContent, Style};

/// Border drawn around one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BorderWeight {
    #[default]
    None,
    Thin,
    /// Thin, with a heavier right edge.
    PageEdge,
}

/// Everything the grid adapter decides about one cell's look.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellFormat {
    pub style: Option<Style>,
    pub border: BorderWeight,
}

/// Persistent cell grid. Rows and columns are zero-based; sizes are points.
pub trait GridSurface {
    fn set_column_width(&mut self, col: usize, width: f32);

    fn set_row_height(&mut self, row: usize, height: f32);

    fn set_cell_value(&mut self, row: usize, col: usize, value: &str);

    /// Merges the inclusive range; the top-left cell keeps the value.
    fn merge_cells(&mut self, first_row: usize, first_col: usize, last_row: usize, last_col: usize);

    fn set_cell_style(&mut self, row: usize, col: usize, format: CellFormat);

    /// Anchors a picture over the inclusive cell range `top_left..=bottom_right`,
    /// both given as `(row, col)`.
    fn place_image(
        &mut self,
        data: &[u8],
        top_left: (usize, usize),
        bottom_right: (usize, usize),
    ) -> Result<(), Error>;
}

/// Writes `layout` into `surface`: sizes, merged text and filler regions,
/// anchored pictures and one format per cell. Returns the number of images
/// that could be placed.
pub fn render_to_grid<S: GridSurface + ?Sized>(layout: &Layout, surface: &mut S) -> usize {
    for (col, width) in layout.column_widths.iter().enumerate() {
        surface.set_column_width(col, *width);
    }
    for (row, height) in layout.row_heights.iter().enumerate() {
        surface.set_row_height(row, *height);
    }

    let mut placed = 0;
    for region in &layout.regions {
        let rect = region.rect;
        match &region.content {
            RegionContent::Image { data } => {
                match surface.place_image(
                    data,
                    (rect.rows.start, rect.cols.start),
                    (rect.rows.end, rect.cols.end),
                ) {
                    Ok(()) => placed += 1,
                    Err(e) => log::warn!(
                        "Skipping image at row {} col {}: {e}",
                        rect.rows.start,
                        rect.cols.start
                    ),
                }
            }
            RegionContent::Text { .. } | RegionContent::Decoration(_) => {
                if rect.rows.len() > 1 || rect.cols.len() > 1 {
                    surface.merge_cells(rect.rows.start, rect.cols.start, rect.rows.end, rect.cols.end);
                }
                if let Some(text) = region.text_content().filter(|t| !t.is_empty()) {
                    surface.set_cell_value(rect.rows.start, rect.cols.start, text);
                }
            }
        }
    }

    let columns = layout.columns();
    let mut borders = vec![BorderWeight::None; layout.rows() * columns];
    for b in &layout.borders {
        borders[b.row * columns + b.col] = if b.page_edge {
            BorderWeight::PageEdge
        } else {
            BorderWeight::Thin
        };
    }
    for (idx, owner) in layout.owner_grid().into_iter().enumerate() {
        let style = owner.and_then(|i| match layout.regions[i].content {
            RegionContent::Text { style, .. } => Some(style),
            _ => None,
        });
        surface.set_cell_style(
            idx / columns,
            idx % columns,
            CellFormat {
                style,
                border: borders[idx],
            },
        );
    }

    placed
}
