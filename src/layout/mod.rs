//! Layout compositor: turns an [`SopRecord`] into an ordered list of placed
//! regions on a 60-column logical grid, shared by the page and grid backends.

mod allocator;
mod gallery;
mod header;
mod measure;
mod signatures;
mod tables;

use crate::model::SopRecord;

pub use allocator::{Lane, LayoutCursor, OccupancyIndex, RegionAllocator};
pub use gallery::{GuidanceKind, GuidanceTile, interleave_dos_donts};
pub use measure::{CharEstimate, LINE_HEIGHT_RATIO, TextMeasure, Weighted, wrap_lines};
pub use signatures::{MAX_SIGNATURE_BOXES, NO_SIGNERS_MARKER};

/// Every section builder lays out against this many logical columns.
pub const COLUMNS: usize = 60;

/// Inner padding between a region's edge and its text, in points.
pub const CELL_PADDING: f32 = 3.0;

/// Inclusive index range along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "span start {start} is past its end {end}");
        Self { start, end }
    }

    pub fn single(index: usize) -> Self {
        Self::new(index, index)
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Splits consecutive columns starting at `start` into spans of the given widths.
pub(crate) fn split_columns(start: usize, widths: &[usize]) -> Vec<Span> {
    let mut col = start;
    widths
        .iter()
        .map(|&w| {
            let span = Span::new(col, col + w - 1);
            col += w;
            span
        })
        .collect()
}

/// Divides `cols` into `per_row` equal tiles; leftover columns stay unused.
pub(crate) fn tile_columns(cols: Span, per_row: usize) -> Vec<Span> {
    let width = cols.len() / per_row;
    assert!(width > 0, "{} columns cannot hold {per_row} tiles", cols.len());
    (0..per_row)
        .map(|i| Span::new(cols.start + i * width, cols.start + (i + 1) * width - 1))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRect {
    pub rows: Span,
    pub cols: Span,
}

impl CellRect {
    pub fn new(rows: Span, cols: Span) -> Self {
        Self { rows, cols }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.rows.contains(row) && self.cols.contains(col)
    }

    pub fn overlaps(&self, other: &CellRect) -> bool {
        self.rows.overlaps(&other.rows) && self.cols.overlaps(&other.cols)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    Header,
    Images,
    Guidance,
    Steps,
    Safety,
    Revisions,
    Signatures,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Header,
        Section::Images,
        Section::Guidance,
        Section::Steps,
        Section::Safety,
        Section::Revisions,
        Section::Signatures,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HAlign {
    Left,
    Center,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VAlign {
    Top,
    Center,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Style {
    Title,
    Subtitle,
    Banner,
    Label,
    Value,
    TableHeader,
    Body,
    BodyCenter,
    Caption,
    /// Don't captions: bold red so they read as warnings.
    Alert,
    Total,
    SignatureName,
    SignatureRole,
    SignatureLine,
    Diagnostic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleSpec {
    pub font_size: f32,
    pub bold: bool,
    pub color: [u8; 3],
    pub fill: Option<[u8; 3]>,
    pub h_align: HAlign,
    pub v_align: VAlign,
}

impl StyleSpec {
    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_RATIO
    }
}

const BLACK: [u8; 3] = [0, 0, 0];
const WHITE: [u8; 3] = [255, 255, 255];
const ALERT_RED: [u8; 3] = [192, 0, 0];
const NAVY: [u8; 3] = [31, 56, 100];

impl Style {
    pub const ALL: [Style; 15] = [
        Style::Title,
        Style::Subtitle,
        Style::Banner,
        Style::Label,
        Style::Value,
        Style::TableHeader,
        Style::Body,
        Style::BodyCenter,
        Style::Caption,
        Style::Alert,
        Style::Total,
        Style::SignatureName,
        Style::SignatureRole,
        Style::SignatureLine,
        Style::Diagnostic,
    ];

    pub fn spec(self) -> StyleSpec {
        let base = StyleSpec {
            font_size: 8.0,
            bold: false,
            color: BLACK,
            fill: None,
            h_align: HAlign::Left,
            v_align: VAlign::Center,
        };
        match self {
            Style::Title => StyleSpec {
                font_size: 14.0,
                bold: true,
                color: WHITE,
                fill: Some(NAVY),
                h_align: HAlign::Center,
                ..base
            },
            Style::Subtitle => StyleSpec {
                font_size: 12.0,
                bold: true,
                color: WHITE,
                fill: Some(NAVY),
                h_align: HAlign::Center,
                ..base
            },
            Style::Banner => StyleSpec {
                font_size: 10.0,
                bold: true,
                color: WHITE,
                fill: Some([47, 84, 150]),
                ..base
            },
            Style::Label => StyleSpec {
                bold: true,
                fill: Some([221, 235, 247]),
                ..base
            },
            Style::Value => base,
            Style::TableHeader => StyleSpec {
                bold: true,
                fill: Some([217, 217, 217]),
                h_align: HAlign::Center,
                ..base
            },
            Style::Body => StyleSpec {
                v_align: VAlign::Top,
                ..base
            },
            Style::BodyCenter => StyleSpec {
                h_align: HAlign::Center,
                ..base
            },
            Style::Caption => StyleSpec {
                font_size: 7.0,
                h_align: HAlign::Center,
                ..base
            },
            Style::Alert => StyleSpec {
                font_size: 7.0,
                bold: true,
                color: ALERT_RED,
                h_align: HAlign::Center,
                ..base
            },
            Style::Total => StyleSpec {
                font_size: 9.0,
                bold: true,
                fill: Some([255, 242, 204]),
                h_align: HAlign::Center,
                ..base
            },
            Style::SignatureName => StyleSpec {
                font_size: 9.0,
                bold: true,
                h_align: HAlign::Center,
                ..base
            },
            Style::SignatureRole => StyleSpec {
                color: [89, 89, 89],
                h_align: HAlign::Center,
                ..base
            },
            Style::SignatureLine => StyleSpec {
                h_align: HAlign::Center,
                ..base
            },
            Style::Diagnostic => StyleSpec {
                bold: true,
                color: ALERT_RED,
                h_align: HAlign::Center,
                ..base
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decoration {
    /// Blank area that still reads as one merged cell.
    Filler,
    /// Thin separator row below the header block.
    Spacer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Text,
    Image,
    Decoration,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RegionContent<'a> {
    Text { text: String, style: Style },
    Image { data: &'a [u8] },
    Decoration(Decoration),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedRegion<'a> {
    pub section: Section,
    pub rect: CellRect,
    pub content: RegionContent<'a>,
}

impl<'a> PlacedRegion<'a> {
    pub fn text(section: Section, rows: Span, cols: Span, text: impl Into<String>, style: Style) -> Self {
        Self {
            section,
            rect: CellRect::new(rows, cols),
            content: RegionContent::Text {
                text: text.into(),
                style,
            },
        }
    }

    pub fn decoration(section: Section, rows: Span, cols: Span, decoration: Decoration) -> Self {
        Self {
            section,
            rect: CellRect::new(rows, cols),
            content: RegionContent::Decoration(decoration),
        }
    }

    pub fn kind(&self) -> RegionKind {
        match self.content {
            RegionContent::Text { .. } => RegionKind::Text,
            RegionContent::Image { .. } => RegionKind::Image,
            RegionContent::Decoration(_) => RegionKind::Decoration,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            RegionContent::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Border applied to one grid cell by the final decorative pass. `page_edge`
/// marks the last column, whose right edge is drawn heavier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellBorder {
    pub row: usize,
    pub col: usize,
    pub page_edge: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Form {
    Grid,
    Page,
}

/// Constants that differ between the spreadsheet and the page rendition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutProfile {
    pub form: Form,
    /// Width of one logical column in points, used for text measurement.
    pub column_width: f32,
    pub images_per_row: usize,
    pub guidance_per_row: usize,
    pub quality_per_row: usize,
    pub step_header_rows: usize,
    pub image_row_height: f32,
    pub guidance_image_height: f32,
    pub step_row_height: f32,
    pub lane_fractions: [f32; 2],
    pub lane_gap: usize,
}

/// A4 landscape, in points.
pub const PAGE_WIDTH: f32 = 841.89;
pub const PAGE_HEIGHT: f32 = 595.28;
/// 10 mm on every side.
pub const PAGE_MARGIN: f32 = 28.35;

impl LayoutProfile {
    pub fn grid() -> Self {
        Self {
            form: Form::Grid,
            column_width: 13.0,
            images_per_row: 3,
            guidance_per_row: 3,
            quality_per_row: 3,
            step_header_rows: 2,
            image_row_height: 110.0,
            guidance_image_height: 70.0,
            step_row_height: 42.0,
            lane_fractions: [0.60, 0.35],
            lane_gap: 3,
        }
    }

    pub fn page() -> Self {
        Self {
            form: Form::Page,
            column_width: (PAGE_WIDTH - 2.0 * PAGE_MARGIN) / COLUMNS as f32,
            images_per_row: 4,
            guidance_per_row: 4,
            quality_per_row: 3,
            step_header_rows: 1,
            image_row_height: 90.0,
            guidance_image_height: 60.0,
            step_row_height: 36.0,
            lane_fractions: [0.60, 0.35],
            lane_gap: 3,
        }
    }
}

/// Result of composing one record.
#[derive(Clone, Debug)]
pub struct Layout<'a> {
    pub profile: LayoutProfile,
    pub column_widths: Vec<f32>,
    pub row_heights: Vec<f32>,
    pub regions: Vec<PlacedRegion<'a>>,
    pub occupancy: OccupancyIndex,
    pub borders: Vec<CellBorder>,
}

impl<'a> Layout<'a> {
    pub fn rows(&self) -> usize {
        self.row_heights.len()
    }

    pub fn columns(&self) -> usize {
        self.column_widths.len()
    }

    pub fn regions_in(&self, section: Section) -> impl Iterator<Item = &PlacedRegion<'a>> {
        self.regions.iter().filter(move |r| r.section == section)
    }

    /// Row-major table mapping every cell to the index of the region covering it.
    pub fn owner_grid(&self) -> Vec<Option<usize>> {
        let cols = self.columns();
        let mut grid = vec![None; self.rows() * cols];
        for (idx, region) in self.regions.iter().enumerate() {
            for row in region.rect.rows.iter() {
                for col in region.rect.cols.iter() {
                    if row < self.rows() && col < cols {
                        grid[row * cols + col] = Some(idx);
                    }
                }
            }
        }
        grid
    }

    /// True when no row boundary at `row` cuts through a multi-row region,
    /// so a page break may be inserted before it.
    pub fn is_breakable_before(&self, row: usize) -> bool {
        !self
            .regions
            .iter()
            .any(|r| r.rect.rows.start < row && row <= r.rect.rows.end)
    }
}

/// Runs the section builders in document order against one allocator and
/// finishes with the global border pass.
pub fn compose<'a>(
    record: &'a SopRecord,
    profile: &LayoutProfile,
    measure: &dyn TextMeasure,
) -> Layout<'a> {
    let mut alloc = RegionAllocator::new(*profile, measure);
    let mut regions: Vec<PlacedRegion<'a>> = Vec::new();
    let full = Span::new(0, COLUMNS - 1);

    let start = alloc.cursor().row;
    regions.extend(header::build(record, &mut alloc));
    close_stage(&mut regions, &alloc, start, full, Section::Header);

    // Images and do's/don'ts run side by side and meet again before the steps.
    let start = alloc.cursor().row;
    let mut lanes = alloc.reserve_parallel_columns(&profile.lane_fractions);
    {
        let (left, right) = lanes.split_at_mut(1);
        regions.extend(gallery::build_images(record, &mut alloc, &mut left[0]));
        regions.extend(gallery::build_guidance(record, &mut alloc, &mut right[0]));
    }
    let images_cols = lanes[0].cols();
    let end_row = alloc.reconcile(&lanes);
    log::debug!(
        "gallery lanes: images end {:?}, guidance end {:?}, reconciled at row {end_row}",
        lanes[0].end_row(),
        lanes[1].end_row()
    );
    close_stage(&mut regions, &alloc, start, images_cols, Section::Images);
    close_stage(
        &mut regions,
        &alloc,
        start,
        Span::new(images_cols.end + 1, COLUMNS - 1),
        Section::Guidance,
    );

    let start = alloc.cursor().row;
    regions.extend(tables::build_steps(record, &mut alloc));
    close_stage(&mut regions, &alloc, start, full, Section::Steps);

    let start = alloc.cursor().row;
    regions.extend(tables::build_safety(record, &mut alloc));
    close_stage(&mut regions, &alloc, start, full, Section::Safety);

    let start = alloc.cursor().row;
    regions.extend(tables::build_revisions(record, &mut alloc));
    close_stage(&mut regions, &alloc, start, full, Section::Revisions);

    let start = alloc.cursor().row;
    regions.extend(signatures::build(record, &mut alloc));
    close_stage(&mut regions, &alloc, start, full, Section::Signatures);

    let (row_heights, cursor) = alloc.into_parts();
    // Must run last: every image has to be in the occupancy index by now.
    let borders = border_pass(row_heights.len(), COLUMNS, &cursor.occupancy);

    Layout {
        profile: *profile,
        column_widths: vec![profile.column_width; COLUMNS],
        row_heights,
        regions,
        occupancy: cursor.occupancy,
        borders,
    }
}

/// Covers whatever the section left empty inside its rows with filler
/// regions, so every cell ends up owned by exactly one region.
fn close_stage(
    regions: &mut Vec<PlacedRegion<'_>>,
    alloc: &RegionAllocator,
    start_row: usize,
    cols: Span,
    section: Section,
) {
    let end_row = alloc.cursor().rows_consumed;
    if end_row <= start_row {
        return;
    }
    let area = CellRect::new(Span::new(start_row, end_row - 1), cols);
    let fillers = fill_gaps(regions, area, section);
    log::debug!(
        "{section:?}: rows {}..={}, {} regions, {} fillers",
        area.rows.start,
        area.rows.end,
        regions.iter().filter(|r| r.section == section).count(),
        fillers.len()
    );
    regions.extend(fillers);
}

fn fill_gaps<'a>(regions: &[PlacedRegion<'a>], area: CellRect, section: Section) -> Vec<PlacedRegion<'a>> {
    let width = area.cols.len();
    let mut covered = vec![false; area.rows.len() * width];
    for region in regions.iter().filter(|r| r.rect.overlaps(&area)) {
        for row in region.rect.rows.iter().filter(|r| area.rows.contains(*r)) {
            for col in region.rect.cols.iter().filter(|c| area.cols.contains(*c)) {
                covered[(row - area.rows.start) * width + (col - area.cols.start)] = true;
            }
        }
    }

    let mut out = Vec::new();
    // Uncovered runs still growing downwards: (cols, first row).
    let mut open: Vec<(Span, usize)> = Vec::new();
    for row in area.rows.iter() {
        let offset = (row - area.rows.start) * width;
        let mut runs = Vec::new();
        let mut run_start = None;
        for i in 0..=width {
            let free = i < width && !covered[offset + i];
            match (free, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(s)) => {
                    runs.push(Span::new(area.cols.start + s, area.cols.start + i - 1));
                    run_start = None;
                }
                _ => {}
            }
        }

        let mut still_open = Vec::with_capacity(runs.len());
        for (cols, first) in open.drain(..) {
            if runs.contains(&cols) {
                still_open.push((cols, first));
            } else {
                out.push(PlacedRegion::decoration(
                    section,
                    Span::new(first, row - 1),
                    cols,
                    Decoration::Filler,
                ));
            }
        }
        for run in runs {
            if !still_open.iter().any(|(cols, _)| *cols == run) {
                still_open.push((run, row));
            }
        }
        open = still_open;
    }
    for (cols, first) in open {
        out.push(PlacedRegion::decoration(
            section,
            Span::new(first, area.rows.end),
            cols,
            Decoration::Filler,
        ));
    }
    out
}

fn border_pass(rows: usize, columns: usize, occupancy: &OccupancyIndex) -> Vec<CellBorder> {
    (0..rows)
        .flat_map(|row| (0..columns).map(move |col| (row, col)))
        .filter(|&(row, col)| !occupancy.covers(row, col))
        .map(|(row, col)| CellBorder {
            row,
            col,
            page_edge: col == columns - 1,
        })
        .collect()
}
