mod common;

use sop_report::layout::{CharEstimate, Layout, LayoutProfile, RegionKind, Style, compose};
use sop_report::pdf::{
    PAGE_EDGE_BORDER_WIDTH, PageGeometry, PageOverflow, PageSurface, TextStyle,
    place_rows,
};
use sop_report::{
    Error, FontMetrics, FontSource, PdfCanvas, RenderOptions, SopRecord, TextMeasure, render_to_page,
};

#[derive(Debug, Clone, Copy)]
struct Line {
    page: usize,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    width: f32,
}

/// Page surface that records every call, tagged with the page it landed on.
struct RecordingPage {
    geometry: PageGeometry,
    pages: usize,
    fills: Vec<(usize, [u8; 3])>,
    lines: Vec<Line>,
    texts: Vec<(usize, String, TextStyle)>,
    text_x: Vec<(String, f32)>,
    images: Vec<(usize, [f32; 4])>,
    reject_images: bool,
}

impl RecordingPage {
    fn new() -> Self {
        Self {
            geometry: PageGeometry::a4_landscape(),
            pages: 0,
            fills: Vec::new(),
            lines: Vec::new(),
            texts: Vec::new(),
            text_x: Vec::new(),
            images: Vec::new(),
            reject_images: false,
        }
    }

    fn current(&self) -> usize {
        self.pages.saturating_sub(1)
    }

    fn has_text(&self, text: &str) -> bool {
        self.texts.iter().any(|(_, t, _)| t == text)
    }
}

impl PageSurface for RecordingPage {
    fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    fn add_page(&mut self) {
        self.pages += 1;
    }

    fn draw_rect(&mut self, _x: f32, _y: f32, _w: f32, _h: f32, color: [u8; 3]) {
        self.fills.push((self.current(), color));
    }

    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        self.lines.push(Line {
            page: self.current(),
            x1,
            y1,
            x2,
            y2,
            width,
        });
    }

    fn draw_text(&mut self, text: &str, x: f32, _baseline: f32, style: &TextStyle) {
        self.texts.push((self.current(), text.to_string(), *style));
        self.text_x.push((text.to_string(), x));
    }

    fn draw_image(&mut self, _data: &[u8], x: f32, y: f32, w: f32, h: f32) -> Result<(), Error> {
        if self.reject_images {
            return Err(Error::Image("rejected".into()));
        }
        self.images.push((self.current(), [x, y, w, h]));
        Ok(())
    }
}

fn page_layout(record: &SopRecord) -> Layout<'_> {
    compose(record, &LayoutProfile::page(), &CharEstimate::default())
}

fn draw(layout: &Layout, overflow: PageOverflow) -> (RecordingPage, usize) {
    let mut surface = RecordingPage::new();
    let pages = render_to_page(layout, &mut surface, &CharEstimate::default(), overflow);
    (surface, pages)
}

#[test]
fn overlap_keeps_everything_on_one_page() {
    let record = common::busy_record();
    let layout = page_layout(&record);
    let (surface, pages) = draw(&layout, PageOverflow::Overlap);
    assert_eq!(pages, 1);
    assert_eq!(surface.pages, 1);
    assert!(surface.has_text("REVISION HISTORY"));
    assert!(surface.has_text("A. Rao"));
}

#[test]
fn paginate_breaks_between_blocks() {
    let record = common::busy_record();
    let layout = page_layout(&record);
    let geometry = PageGeometry::a4_landscape();

    let slots = place_rows(&layout, &geometry, PageOverflow::Paginate);
    assert!(slots.last().expect("rows").page >= 1);
    assert!(slots.windows(2).all(|w| w[0].page <= w[1].page));

    // No region is split across pages.
    for region in &layout.regions {
        assert_eq!(
            slots[region.rect.rows.start].page,
            slots[region.rect.rows.end].page,
            "{:?} {:?}",
            region.section,
            region.rect
        );
    }
    // Every page starts at the top margin.
    for w in slots.windows(2).filter(|w| w[0].page != w[1].page) {
        assert_eq!(w[1].top, geometry.margin);
    }

    let (surface, pages) = draw(&layout, PageOverflow::Paginate);
    assert_eq!(pages, slots.last().expect("rows").page + 1);
    assert_eq!(surface.pages, pages);
    assert!(surface.texts.iter().any(|(page, _, _)| *page == pages - 1));
}

#[test]
fn blocks_that_fit_stay_above_the_bottom_margin() {
    let record = common::busy_record();
    let layout = page_layout(&record);
    let geometry = PageGeometry::a4_landscape();
    let slots = place_rows(&layout, &geometry, PageOverflow::Paginate);
    for (row, slot) in slots.iter().enumerate() {
        let bottom = slot.top + layout.row_heights[row];
        // Single-row blocks are always short enough to fit a fresh page.
        if layout.is_breakable_before(row) && layout.is_breakable_before(row + 1) {
            assert!(bottom <= geometry.content_bottom() + 0.01, "row {row} ends at {bottom}");
        }
    }
}

#[test]
fn no_border_lines_cross_pictures() {
    let record = common::busy_record();
    let layout = page_layout(&record);
    let (surface, _) = draw(&layout, PageOverflow::Overlap);
    let expected = layout
        .regions
        .iter()
        .filter(|r| r.kind() == RegionKind::Image)
        .count();
    assert_eq!(surface.images.len(), expected);

    for (page, [x, y, w, h]) in &surface.images {
        for line in surface.lines.iter().filter(|l| l.page == *page) {
            let mx = (line.x1 + line.x2) / 2.0;
            let my = (line.y1 + line.y2) / 2.0;
            let inside = mx > *x + 0.01 && mx < x + w - 0.01 && my > *y + 0.01 && my < y + h - 0.01;
            assert!(!inside, "{line:?} crosses picture at {x},{y}");
        }
    }
}

#[test]
fn last_column_gets_the_heavy_edge() {
    let record = common::scenario_record();
    let layout = page_layout(&record);
    let (surface, _) = draw(&layout, PageOverflow::Overlap);
    let geometry = PageGeometry::a4_landscape();
    let right = geometry.width - geometry.margin;

    let heavy: Vec<&Line> = surface
        .lines
        .iter()
        .filter(|l| l.width == PAGE_EDGE_BORDER_WIDTH)
        .collect();
    assert!(!heavy.is_empty());
    for line in heavy {
        assert_eq!(line.x1, line.x2);
        assert!((line.x1 - right).abs() < 0.05, "heavy edge at x={}", line.x1);
    }
}

#[test]
fn rejected_pictures_only_warn() {
    common::init_logging();
    let record = common::scenario_record();
    let layout = page_layout(&record);
    let mut surface = RecordingPage::new();
    surface.reject_images = true;
    let pages = render_to_page(&layout, &mut surface, &CharEstimate::default(), PageOverflow::Overlap);
    assert_eq!(pages, 1);
    assert!(surface.images.is_empty());
    assert!(surface.has_text("Safety helmet"));
}

#[test]
fn unrecognised_image_bytes_are_skipped() {
    common::init_logging();
    let mut record = common::scenario_record();
    record.images[0].image_data = b"garbage".to_vec();
    let layout = page_layout(&record);
    let (surface, _) = draw(&layout, PageOverflow::Overlap);
    assert_eq!(surface.images.len(), 3);
}

#[test]
fn title_band_uses_its_style() {
    let record = common::scenario_record();
    let layout = page_layout(&record);
    let (surface, _) = draw(&layout, PageOverflow::Overlap);
    let (_, _, style) = surface
        .texts
        .iter()
        .find(|(_, t, _)| t == "STANDARD OPERATING PROCEDURE")
        .expect("subtitle drawn");
    assert!(style.bold);
    assert_eq!(style.color, [255, 255, 255]);
    assert!(surface.fills.iter().any(|(_, c)| *c == [31, 56, 100]));
}

#[test]
fn long_text_is_wrapped_into_several_lines() {
    let record = common::busy_record();
    let layout = page_layout(&record);
    let (surface, _) = draw(&layout, PageOverflow::Overlap);
    assert!(!surface.has_text(&record.steps[2].description));
    assert!(
        surface
            .texts
            .iter()
            .any(|(_, t, _)| t.starts_with("Check the breather"))
    );
}

#[test]
fn pdf_bytes_have_header_and_trailer() {
    common::init_logging();
    let record = common::scenario_record();
    let bytes = sop_report::render_pdf(&record, &RenderOptions::default()).expect("render pdf");
    assert!(bytes.starts_with(b"%PDF"));
    assert!(bytes.windows(5).any(|w| w == b"%%EOF"));
}

#[test]
fn pdf_canvas_counts_paginated_pages() {
    let record = common::busy_record();
    let mut canvas = PdfCanvas::new(PageGeometry::a4_landscape(), &FontSource::Builtin);
    let metrics = canvas.metrics();
    let layout = compose(&record, &LayoutProfile::page(), &metrics);
    let pages = render_to_page(&layout, &mut canvas, &metrics, PageOverflow::Paginate);
    assert!(pages > 1);
    assert_eq!(canvas.page_count(), pages);
    assert!(canvas.finish().starts_with(b"%PDF"));
}

#[test]
fn pdf_canvas_embeds_jpeg_and_rejects_garbage() {
    let mut canvas = PdfCanvas::new(PageGeometry::a4_landscape(), &FontSource::Builtin);
    canvas.add_page();
    assert!(canvas.draw_image(&common::jpeg(10, 6), 10.0, 10.0, 50.0, 30.0).is_ok());
    assert!(
        canvas
            .draw_image(&common::png(4, 4, [0, 0, 0], 100), 10.0, 50.0, 20.0, 20.0)
            .is_ok()
    );
    assert!(matches!(
        canvas.draw_image(b"garbage", 0.0, 0.0, 10.0, 10.0),
        Err(Error::Image(_))
    ));
}

#[test]
fn missing_font_file_falls_back_to_helvetica() {
    common::init_logging();
    let options = RenderOptions {
        font: FontSource::TrueType {
            regular: "/nonexistent/font.ttf".into(),
            bold: None,
        },
        page_overflow: PageOverflow::Paginate,
    };
    let bytes = sop_report::render_pdf(&common::scenario_record(), &options).expect("render pdf");
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn empty_record_renders_one_page() {
    let bytes = sop_report::render_pdf(&SopRecord::default(), &RenderOptions::default())
        .expect("render empty pdf");
    assert!(bytes.starts_with(b"%PDF"));

    let empty = SopRecord::default();
    let layout = page_layout(&empty);
    let (surface, pages) = draw(&layout, PageOverflow::Paginate);
    assert_eq!(pages, surface.pages);
    assert!(surface.has_text("APPROVALS"));
}

#[test]
fn helvetica_metrics_drive_wrapping() {
    let metrics = FontMetrics::helvetica();
    assert!(metrics.text_width("MMMM", 10.0) > metrics.text_width("iiii", 10.0));
    assert_eq!(metrics.char_width_1000(' '), 278.0);
    // Characters outside WinAnsi still take up room.
    assert_eq!(metrics.char_width_1000('\u{4E2D}'), 556.0);
    assert_eq!(metrics.measure("", 100.0, 10.0), 1);
    // "one two" / "three" / "four five" / "six"
    assert_eq!(metrics.measure("one two three four five six", 40.0, 10.0), 4);
}

/// Bold text twice as wide as regular text.
struct WideBold {
    regular: CharEstimate,
    bold: CharEstimate,
}

impl WideBold {
    fn new() -> Self {
        Self {
            regular: CharEstimate::default(),
            bold: CharEstimate { em_ratio: 1.0 },
        }
    }
}

impl TextMeasure for WideBold {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.regular.text_width(text, font_size)
    }

    fn measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        self.regular.measure(text, max_width, font_size)
    }

    fn bold_text_width(&self, text: &str, font_size: f32) -> f32 {
        self.bold.text_width(text, font_size)
    }

    fn bold_measure(&self, text: &str, max_width: f32, font_size: f32) -> usize {
        self.bold.measure(text, max_width, font_size)
    }
}

#[test]
fn bold_text_is_centred_with_bold_widths() {
    let record = common::scenario_record();
    let layout = page_layout(&record);

    let mut plain = RecordingPage::new();
    render_to_page(&layout, &mut plain, &CharEstimate::default(), PageOverflow::Overlap);
    let mut wide = RecordingPage::new();
    render_to_page(&layout, &mut wide, &WideBold::new(), PageOverflow::Overlap);

    let x_of = |surface: &RecordingPage, text: &str| {
        surface
            .text_x
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, x)| *x)
            .unwrap_or_else(|| panic!("{text} not drawn"))
    };
    // Title is bold and centred: wider glyphs start further left.
    let title = "Northern Grid Maintenance";
    let shift = x_of(&plain, title) - x_of(&wide, title);
    let half_extra = title.len() as f32 * Style::Title.spec().font_size * 0.5 / 2.0;
    assert!((shift - half_extra).abs() < 0.01, "shifted by {shift}");
    // Captions are regular weight and do not move.
    let caption = "Step 1: Isolation point";
    assert_eq!(x_of(&plain, caption), x_of(&wide, caption));
}

#[test]
fn canvas_metrics_follow_the_font_weight() {
    let canvas = PdfCanvas::new(PageGeometry::a4_landscape(), &FontSource::Builtin);
    let pair = canvas.metrics();
    assert_eq!(
        canvas.metrics_for(true).char_width_1000('M'),
        pair.bold.char_width_1000('M')
    );
    assert_eq!(
        canvas.metrics_for(false).text_width("SOP", 10.0),
        pair.text_width("SOP", 10.0)
    );
    assert_eq!(pair.bold_text_width("SOP", 10.0), pair.bold.text_width("SOP", 10.0));
}
