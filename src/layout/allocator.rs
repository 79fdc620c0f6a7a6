use super::measure::{LINE_HEIGHT_RATIO, TextMeasure, Weighted};
use super::{
    CELL_PADDING, COLUMNS, CellRect, LayoutProfile, PlacedRegion, RegionContent, Section, Span,
    Style,
};

/// Rectangles covered by embedded images. Border decoration must skip them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OccupancyIndex {
    rects: Vec<CellRect>,
}

impl OccupancyIndex {
    /// Recording the same rectangle twice is a no-op.
    pub fn record(&mut self, rect: CellRect) {
        if !self.rects.contains(&rect) {
            self.rects.push(rect);
        }
    }

    pub fn covers(&self, row: usize, col: usize) -> bool {
        self.rects.iter().any(|r| r.contains(row, col))
    }

    pub fn rects(&self) -> &[CellRect] {
        &self.rects
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

/// Mutable composition state for one render.
#[derive(Clone, Debug, Default)]
pub struct LayoutCursor {
    /// Next row a full-width reservation starts at.
    pub row: usize,
    /// Leftmost column still available for parallel lanes.
    pub col: usize,
    /// High-water mark: rows `0..rows_consumed` have been handed out.
    pub rows_consumed: usize,
    pub occupancy: OccupancyIndex,
}

/// A column-scoped sub-cursor for sections laid out side by side.
#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    cols: Span,
    start_row: usize,
    next_row: usize,
}

impl Lane {
    pub fn cols(&self) -> Span {
        self.cols
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    pub fn next_row(&self) -> usize {
        self.next_row
    }

    /// Last row this lane used, `None` while it is still empty.
    pub fn end_row(&self) -> Option<usize> {
        (self.next_row > self.start_row).then(|| self.next_row - 1)
    }
}

/// Hands out non-overlapping row ranges and column lanes, and keeps the row
/// heights requested for them. A row shared by two lanes takes the taller
/// request.
pub struct RegionAllocator<'m> {
    profile: LayoutProfile,
    measure: &'m dyn TextMeasure,
    cursor: LayoutCursor,
    row_heights: Vec<f32>,
}

impl<'m> RegionAllocator<'m> {
    pub fn new(profile: LayoutProfile, measure: &'m dyn TextMeasure) -> Self {
        Self {
            profile,
            measure,
            cursor: LayoutCursor::default(),
            row_heights: Vec::new(),
        }
    }

    pub fn profile(&self) -> &LayoutProfile {
        &self.profile
    }

    pub fn cursor(&self) -> &LayoutCursor {
        &self.cursor
    }

    pub fn row_heights(&self) -> &[f32] {
        &self.row_heights
    }

    pub fn full_width(&self) -> Span {
        Span::new(0, COLUMNS - 1)
    }

    /// Width of a column span in points.
    pub fn span_width(&self, cols: Span) -> f32 {
        cols.len() as f32 * self.profile.column_width
    }

    /// Claims `count` full-width rows at the cursor, each at least `height`
    /// points tall.
    pub fn reserve_rows(&mut self, count: usize, height: f32) -> Span {
        check_extent(count, height);
        assert!(
            self.cursor.row >= self.cursor.rows_consumed,
            "full-width reservation at row {} would reuse rows below {}; reconcile lanes first",
            self.cursor.row,
            self.cursor.rows_consumed
        );
        let start = self.cursor.row;
        self.grow_rows(start, count, height);
        self.cursor.row = start + count;
        self.cursor.rows_consumed = self.cursor.row;
        Span::new(start, start + count - 1)
    }

    /// Splits the columns right of the cursor into lanes by `fractions`,
    /// separated by the profile's fixed gap. Every lane starts at the cursor row.
    pub fn reserve_parallel_columns(&mut self, fractions: &[f32]) -> Vec<Lane> {
        assert!(!fractions.is_empty(), "at least one lane is required");
        assert!(
            fractions.iter().all(|f| *f > 0.0),
            "lane fractions must be positive: {fractions:?}"
        );
        assert!(
            fractions.iter().sum::<f32>() <= 1.0 + f32::EPSILON,
            "lane fractions exceed the available width: {fractions:?}"
        );
        assert!(
            self.cursor.row >= self.cursor.rows_consumed,
            "lanes at row {} would reuse rows below {}",
            self.cursor.row,
            self.cursor.rows_consumed
        );

        let available = COLUMNS - self.cursor.col;
        let gaps = self.profile.lane_gap * (fractions.len() - 1);
        assert!(available > gaps, "no room for {} lanes", fractions.len());

        let mut col = self.cursor.col;
        let mut lanes = Vec::with_capacity(fractions.len());
        for (i, fraction) in fractions.iter().enumerate() {
            let remaining = COLUMNS - col;
            // Nudge so 0.35 * 60 lands on 21 rather than 20.999.
            let width = ((fraction * available as f32 + 1e-3).floor() as usize).min(remaining);
            assert!(width > 0, "lane {i} of {fractions:?} has no columns");
            lanes.push(Lane {
                cols: Span::new(col, col + width - 1),
                start_row: self.cursor.row,
                next_row: self.cursor.row,
            });
            col += width + self.profile.lane_gap;
        }
        lanes
    }

    /// Claims `count` rows inside one lane.
    pub fn reserve_lane_rows(&mut self, lane: &mut Lane, count: usize, height: f32) -> Span {
        check_extent(count, height);
        let start = lane.next_row;
        self.grow_rows(start, count, height);
        lane.next_row = start + count;
        self.cursor.rows_consumed = self.cursor.rows_consumed.max(lane.next_row);
        Span::new(start, start + count - 1)
    }

    /// Merges lanes back into the single cursor: the next full-width section
    /// starts one past the deepest lane's last row.
    pub fn reconcile(&mut self, lanes: &[Lane]) -> usize {
        assert!(!lanes.is_empty(), "nothing to reconcile");
        let row = lanes
            .iter()
            .map(|l| l.next_row)
            .max()
            .unwrap_or(self.cursor.row);
        self.cursor.row = row;
        self.cursor.rows_consumed = self.cursor.rows_consumed.max(row);
        row
    }

    /// Height needed for `text` wrapped into `available_width` points:
    /// `max(explicit lines, measured lines, 1) * line_height`.
    pub fn measure_wrapped_height(&self, text: &str, available_width: f32, line_height: f32) -> f32 {
        self.wrapped_height(text, available_width, line_height, false)
    }

    fn wrapped_height(&self, text: &str, available_width: f32, line_height: f32, bold: bool) -> f32 {
        assert!(line_height > 0.0, "line height must be positive, got {line_height}");
        let font_size = line_height / LINE_HEIGHT_RATIO;
        let explicit = text.split('\n').count();
        let measure = Weighted {
            inner: self.measure,
            bold,
        };
        let measured = measure.measure(text, available_width.max(0.0), font_size);
        explicit.max(measured).max(1) as f32 * line_height
    }

    /// Row height that fits `text` across `cols` in `style`, padding included.
    pub fn text_height(&self, text: &str, cols: Span, style: Style) -> f32 {
        let inner = self.span_width(cols) - 2.0 * CELL_PADDING;
        let spec = style.spec();
        self.wrapped_height(text, inner, spec.line_height(), spec.bold) + 2.0 * CELL_PADDING
    }

    pub fn record_image_occupancy(&mut self, rows: Span, cols: Span) {
        self.cursor.occupancy.record(CellRect::new(rows, cols));
    }

    /// Builds an image region and records it in the occupancy index.
    pub fn image_region<'a>(
        &mut self,
        section: Section,
        rows: Span,
        cols: Span,
        data: &'a [u8],
    ) -> PlacedRegion<'a> {
        self.record_image_occupancy(rows, cols);
        PlacedRegion {
            section,
            rect: CellRect::new(rows, cols),
            content: RegionContent::Image { data },
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<f32>, LayoutCursor) {
        (self.row_heights, self.cursor)
    }

    fn grow_rows(&mut self, start: usize, count: usize, height: f32) {
        if self.row_heights.len() < start + count {
            self.row_heights.resize(start + count, 0.0);
        }
        for h in &mut self.row_heights[start..start + count] {
            *h = h.max(height);
        }
    }
}

fn check_extent(count: usize, height: f32) {
    assert!(count > 0, "row reservation needs a positive count");
    assert!(
        height > 0.0 && height.is_finite(),
        "row reservation needs a positive height, got {height}"
    );
}
