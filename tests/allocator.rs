use sop_report::layout::{
    COLUMNS, CellRect, CharEstimate, LayoutProfile, OccupancyIndex, RegionAllocator, Span, Style,
    TextMeasure,
};

fn allocator(measure: &CharEstimate) -> RegionAllocator<'_> {
    RegionAllocator::new(LayoutProfile::grid(), measure)
}

#[test]
fn full_width_rows_are_consecutive() {
    let m = CharEstimate::default();
    let mut alloc = allocator(&m);
    assert_eq!(alloc.reserve_rows(2, 20.0), Span::new(0, 1));
    assert_eq!(alloc.reserve_rows(1, 16.0), Span::single(2));
    assert_eq!(alloc.cursor().rows_consumed, 3);
    assert_eq!(alloc.row_heights(), &[20.0, 20.0, 16.0]);
}

#[test]
fn lanes_split_by_fraction_with_gap() {
    let m = CharEstimate::default();
    let mut alloc = allocator(&m);
    alloc.reserve_rows(1, 10.0);
    let lanes = alloc.reserve_parallel_columns(&[0.60, 0.35]);
    assert_eq!(lanes.len(), 2);
    assert_eq!(lanes[0].cols(), Span::new(0, 35));
    // 3-column gap, then 21 columns.
    assert_eq!(lanes[1].cols(), Span::new(39, 59));
    assert!(lanes.iter().all(|l| l.start_row() == 1 && l.end_row().is_none()));
}

#[test]
fn reconcile_takes_the_deepest_lane() {
    let m = CharEstimate::default();
    let mut alloc = allocator(&m);
    let mut lanes = alloc.reserve_parallel_columns(&[0.60, 0.35]);
    alloc.reserve_lane_rows(&mut lanes[0], 2, 30.0);
    alloc.reserve_lane_rows(&mut lanes[1], 5, 12.0);
    alloc.reserve_lane_rows(&mut lanes[0], 1, 50.0);

    assert_eq!(lanes[0].end_row(), Some(2));
    assert_eq!(lanes[1].end_row(), Some(4));
    assert_eq!(alloc.reconcile(&lanes), 5);
    assert_eq!(alloc.reserve_rows(1, 10.0), Span::single(5));

    // Shared rows keep the taller request.
    assert_eq!(&alloc.row_heights()[..5], &[30.0, 30.0, 50.0, 12.0, 12.0]);
}

#[test]
#[should_panic(expected = "reconcile lanes first")]
fn full_width_reservation_before_reconcile_panics() {
    let m = CharEstimate::default();
    let mut alloc = allocator(&m);
    let mut lanes = alloc.reserve_parallel_columns(&[0.5, 0.4]);
    alloc.reserve_lane_rows(&mut lanes[0], 2, 10.0);
    alloc.reserve_rows(1, 10.0);
}

#[test]
#[should_panic(expected = "positive count")]
fn zero_row_reservation_panics() {
    let m = CharEstimate::default();
    allocator(&m).reserve_rows(0, 10.0);
}

#[test]
#[should_panic(expected = "positive height")]
fn negative_height_panics() {
    let m = CharEstimate::default();
    allocator(&m).reserve_rows(1, -4.0);
}

#[test]
#[should_panic(expected = "positive height")]
fn zero_height_lane_rows_panic() {
    let m = CharEstimate::default();
    let mut alloc = allocator(&m);
    let mut lanes = alloc.reserve_parallel_columns(&[0.5]);
    alloc.reserve_lane_rows(&mut lanes[0], 1, 0.0);
}

#[test]
#[should_panic(expected = "exceed the available width")]
fn oversubscribed_lanes_panic() {
    let m = CharEstimate::default();
    allocator(&m).reserve_parallel_columns(&[0.7, 0.5]);
}

#[test]
fn occupancy_is_idempotent() {
    let mut index = OccupancyIndex::default();
    let rect = CellRect::new(Span::new(3, 5), Span::new(10, 19));
    index.record(rect);
    index.record(rect);
    assert_eq!(index.len(), 1);
    assert!(index.covers(4, 12));
    assert!(!index.covers(6, 12));
    assert!(!index.covers(4, 20));

    let m = CharEstimate::default();
    let mut alloc = allocator(&m);
    alloc.record_image_occupancy(Span::new(0, 1), Span::new(0, 5));
    alloc.record_image_occupancy(Span::new(0, 1), Span::new(0, 5));
    assert_eq!(alloc.cursor().occupancy.len(), 1);
}

#[test]
fn wrapped_height_has_a_one_line_floor() {
    let m = CharEstimate::default();
    let alloc = allocator(&m);
    assert_eq!(alloc.measure_wrapped_height("", 100.0, 12.0), 12.0);
    assert_eq!(alloc.measure_wrapped_height("x", 0.0, 12.0), 12.0);
}

#[test]
fn wrapped_height_counts_explicit_lines() {
    let m = CharEstimate::default();
    let alloc = allocator(&m);
    assert_eq!(alloc.measure_wrapped_height("a\nb\nc", 500.0, 10.0), 30.0);
}

#[test]
fn wrapped_height_is_monotonic_in_length() {
    let m = CharEstimate::default();
    let alloc = allocator(&m);
    let mut text = String::new();
    let mut last = 0.0;
    for i in 0..300 {
        text.push(if i % 7 == 6 { ' ' } else { 'w' });
        let h = alloc.measure_wrapped_height(&text, 80.0, 9.6);
        assert!(h >= last, "height shrank at length {}: {h} < {last}", text.len());
        last = h;
    }
    assert!(last > 9.6);
}

#[test]
fn char_estimate_matches_ceiling_formula() {
    let m = CharEstimate::default();
    // 8pt font: 4pt per char, 100pt -> 25 chars per line.
    assert_eq!(m.chars_per_line(100.0, 8.0), 25);
    assert_eq!(m.measure(&"a".repeat(25), 100.0, 8.0), 1);
    assert_eq!(m.measure(&"a".repeat(26), 100.0, 8.0), 2);
    assert_eq!(m.measure(&"a".repeat(51), 100.0, 8.0), 3);
}

#[test]
fn full_width_covers_every_column() {
    let m = CharEstimate::default();
    let alloc = allocator(&m);
    assert_eq!(alloc.full_width(), Span::new(0, COLUMNS - 1));
    assert_eq!(alloc.span_width(Span::new(0, 9)), 130.0);
}

/// Regular text at the default estimate, bold text twice as wide.
struct WideBold;

impl TextMeasure for WideBold {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        CharEstimate::default().text_width(text, font_size)
    }

    fn measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        CharEstimate::default().measure(text, max_width, font_size)
    }

    fn bold_text_width(&self, text: &str, font_size: f32) -> f32 {
        CharEstimate { em_ratio: 1.0 }.text_width(text, font_size)
    }

    fn bold_measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        CharEstimate { em_ratio: 1.0 }.measure(text, max_width, font_size)
    }
}

#[test]
fn bold_styles_are_measured_in_the_bold_face() {
    let alloc = RegionAllocator::new(LayoutProfile::grid(), &WideBold);
    let text = "w".repeat(60);
    let cols = Span::new(0, 9);
    // Same 8pt size: 31 regular or 15 bold characters per 124pt line.
    let line = Style::Value.spec().line_height();
    assert!((alloc.text_height(&text, cols, Style::Value) - (2.0 * line + 6.0)).abs() < 1e-3);
    assert!((alloc.text_height(&text, cols, Style::Label) - (4.0 * line + 6.0)).abs() < 1e-3);
}
