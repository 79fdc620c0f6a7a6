mod common;

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use sop_report::layout::{CharEstimate, LayoutProfile, RegionKind, Style, compose};
use sop_report::xlsx::{BorderWeight, CellFormat};
use sop_report::{Error, GridSurface, RenderOptions, SopRecord, XlsxWorkbook, render_to_grid};

/// Grid surface that records every call.
#[derive(Default)]
struct RecordingGrid {
    widths: BTreeMap<usize, f32>,
    heights: BTreeMap<usize, f32>,
    values: BTreeMap<(usize, usize), String>,
    merges: Vec<(usize, usize, usize, usize)>,
    formats: BTreeMap<(usize, usize), CellFormat>,
    format_calls: usize,
    pictures: Vec<((usize, usize), (usize, usize))>,
    reject_images: bool,
}

impl GridSurface for RecordingGrid {
    fn set_column_width(&mut self, col: usize, width: f32) {
        self.widths.insert(col, width);
    }

    fn set_row_height(&mut self, row: usize, height: f32) {
        self.heights.insert(row, height);
    }

    fn set_cell_value(&mut self, row: usize, col: usize, value: &str) {
        self.values.insert((row, col), value.to_string());
    }

    fn merge_cells(&mut self, first_row: usize, first_col: usize, last_row: usize, last_col: usize) {
        self.merges.push((first_row, first_col, last_row, last_col));
    }

    fn set_cell_style(&mut self, row: usize, col: usize, format: CellFormat) {
        self.format_calls += 1;
        self.formats.insert((row, col), format);
    }

    fn place_image(
        &mut self,
        _data: &[u8],
        top_left: (usize, usize),
        bottom_right: (usize, usize),
    ) -> Result<(), Error> {
        if self.reject_images {
            return Err(Error::Image("rejected".into()));
        }
        self.pictures.push((top_left, bottom_right));
        Ok(())
    }
}

fn record_grid(record: &SopRecord) -> (RecordingGrid, usize, sop_report::Layout<'_>) {
    let layout = compose(record, &LayoutProfile::grid(), &CharEstimate::default());
    let mut grid = RecordingGrid::default();
    let placed = render_to_grid(&layout, &mut grid);
    (grid, placed, layout)
}

fn unzip_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open xlsx");
    let mut part = archive.by_name(name).unwrap_or_else(|_| panic!("missing part {name}"));
    let mut xml = String::new();
    part.read_to_string(&mut xml).expect("read part");
    xml
}

#[test]
fn every_cell_gets_exactly_one_format() {
    let record = common::busy_record();
    let (grid, _, layout) = record_grid(&record);
    let cells = layout.rows() * layout.columns();
    assert_eq!(grid.format_calls, cells);
    assert_eq!(grid.formats.len(), cells);
    assert_eq!(grid.widths.len(), 60);
    assert_eq!(grid.heights.len(), layout.rows());
}

#[test]
fn image_cells_have_no_border() {
    let record = common::busy_record();
    let (grid, placed, layout) = record_grid(&record);
    let images: Vec<_> = layout
        .regions
        .iter()
        .filter(|r| r.kind() == RegionKind::Image)
        .collect();
    assert_eq!(placed, images.len());
    assert_eq!(grid.pictures.len(), images.len());

    for region in images {
        for row in region.rect.rows.iter() {
            for col in region.rect.cols.iter() {
                let format = grid.formats[&(row, col)];
                assert_eq!(format.border, BorderWeight::None, "{row}/{col}");
                assert_eq!(format.style, None);
            }
        }
    }
}

#[test]
fn last_column_carries_the_page_edge() {
    let record = common::scenario_record();
    let (grid, _, layout) = record_grid(&record);
    for row in 0..layout.rows() {
        let format = grid.formats[&(row, 59)];
        if !layout.occupancy.covers(row, 59) {
            assert_eq!(format.border, BorderWeight::PageEdge, "row {row}");
        }
        if !layout.occupancy.covers(row, 0) {
            assert_eq!(grid.formats[&(row, 0)].border, BorderWeight::Thin);
        }
    }
}

#[test]
fn text_lands_in_the_top_left_of_its_merge() {
    let record = common::scenario_record();
    let (grid, _, _) = record_grid(&record);
    assert_eq!(grid.values[&(0, 0)], "Northern Grid Maintenance");
    assert_eq!(grid.values[&(0, 36)], "STANDARD OPERATING PROCEDURE");
    assert!(grid.merges.contains(&(0, 0, 1, 35)));
    assert!(grid.merges.contains(&(0, 36, 1, 59)));
    assert_eq!(grid.formats[&(0, 0)].style, Some(Style::Title));
    assert_eq!(grid.formats[&(1, 40)].style, Some(Style::Subtitle));
}

#[test]
fn merges_never_overlap() {
    let record = common::busy_record();
    let (grid, _, _) = record_grid(&record);
    for (i, a) in grid.merges.iter().enumerate() {
        for b in &grid.merges[i + 1..] {
            let rows = a.0 <= b.2 && b.0 <= a.2;
            let cols = a.1 <= b.3 && b.1 <= a.3;
            assert!(!(rows && cols), "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn rejected_images_are_skipped() {
    common::init_logging();
    let record = common::scenario_record();
    let layout = compose(&record, &LayoutProfile::grid(), &CharEstimate::default());
    let mut grid = RecordingGrid {
        reject_images: true,
        ..Default::default()
    };
    assert_eq!(render_to_grid(&layout, &mut grid), 0);
    assert!(grid.pictures.is_empty());
    assert!(!grid.merges.is_empty());
    assert_eq!(grid.formats.len(), layout.rows() * layout.columns());
}

#[test]
fn workbook_rejects_unknown_image_data() {
    let mut workbook = XlsxWorkbook::new("SOP");
    let err = workbook.place_image(b"not an image", (0, 0), (1, 1));
    assert!(matches!(err, Err(Error::Image(_))));
    assert!(workbook.place_image(&common::jpeg(8, 8), (0, 0), (1, 1)).is_ok());
    assert_eq!(workbook.image_count(), 1);
}

#[test]
fn undecodable_process_image_does_not_abort() {
    common::init_logging();
    let mut record = common::scenario_record();
    record.images[0].image_data = b"garbage".to_vec();
    let layout = compose(&record, &LayoutProfile::grid(), &CharEstimate::default());
    let mut workbook = XlsxWorkbook::new("SOP");
    assert_eq!(render_to_grid(&layout, &mut workbook), 3);
    assert_eq!(workbook.image_count(), 3);
    assert_eq!(workbook.cell_value(0, 0), Some("Northern Grid Maintenance"));
    assert_eq!(workbook.cell_value(1, 0), None);
    assert!(workbook.to_bytes().is_ok());
}

#[test]
fn xlsx_package_has_expected_parts() {
    common::init_logging();
    let record = common::scenario_record();
    let bytes = sop_report::render_xlsx(&record, &RenderOptions::default()).expect("render xlsx");

    let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).expect("open xlsx");
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort_unstable();
    for part in [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/styles.xml",
        "xl/worksheets/sheet1.xml",
        "xl/worksheets/_rels/sheet1.xml.rels",
        "xl/drawings/drawing1.xml",
        "xl/drawings/_rels/drawing1.xml.rels",
        "xl/media/image1.png",
        "xl/media/image4.png",
    ] {
        assert!(names.contains(&part), "missing {part} in {names:?}");
    }
    assert!(!names.contains(&"xl/media/image5.png"));

    let workbook = unzip_part(&bytes, "xl/workbook.xml");
    let doc = roxmltree::Document::parse(&workbook).expect("workbook xml");
    let sheet = doc
        .descendants()
        .find(|n| n.has_tag_name("sheet"))
        .expect("sheet element");
    assert_eq!(sheet.attribute("name"), Some("SOP"));
}

#[test]
fn sheet_xml_holds_merges_and_text() {
    let record = common::scenario_record();
    let bytes = sop_report::render_xlsx(&record, &RenderOptions::default()).expect("render xlsx");
    let sheet = unzip_part(&bytes, "xl/worksheets/sheet1.xml");
    let doc = roxmltree::Document::parse(&sheet).expect("sheet xml");

    let merges: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("mergeCell"))
        .filter_map(|n| n.attribute("ref"))
        .collect();
    assert!(merges.contains(&"A1:AJ2"), "{merges:?}");
    assert!(merges.contains(&"AK1:BH2"), "{merges:?}");
    let declared = doc
        .descendants()
        .find(|n| n.has_tag_name("mergeCells"))
        .and_then(|n| n.attribute("count"))
        .and_then(|c| c.parse::<usize>().ok());
    assert_eq!(declared, Some(merges.len()));

    let texts: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("t"))
        .filter_map(|n| n.text())
        .collect();
    for expected in ["SOP-TR-014", "45 min", "TOTAL STANDARD TIME", "A. Rao", "M. Iyer"] {
        assert!(texts.contains(&expected), "missing {expected}");
    }

    let cols = doc.descendants().filter(|n| n.has_tag_name("col")).count();
    assert_eq!(cols, 60);
    let setup = doc
        .descendants()
        .find(|n| n.has_tag_name("pageSetup"))
        .expect("page setup");
    assert_eq!(setup.attribute("orientation"), Some("landscape"));
}

#[test]
fn drawing_anchors_match_image_regions() {
    let record = common::busy_record();
    let bytes = sop_report::render_xlsx(&record, &RenderOptions::default()).expect("render xlsx");
    let drawing = unzip_part(&bytes, "xl/drawings/drawing1.xml");
    let doc = roxmltree::Document::parse(&drawing).expect("drawing xml");
    let anchors = doc
        .descendants()
        .filter(|n| n.has_tag_name("twoCellAnchor"))
        .count();
    // 7 process images, 4 guidance pictures, 5 PPE pictures.
    assert_eq!(anchors, 16);

    let rels = unzip_part(&bytes, "xl/drawings/_rels/drawing1.xml.rels");
    let doc = roxmltree::Document::parse(&rels).expect("rels xml");
    assert_eq!(
        doc.descendants()
            .filter(|n| n.has_tag_name("Relationship"))
            .count(),
        16
    );
}

#[test]
fn special_characters_are_escaped() {
    let mut record = common::scenario_record();
    record.header.organization = "R&D <North> \"Ops\"".into();
    let bytes = sop_report::render_xlsx(&record, &RenderOptions::default()).expect("render xlsx");
    let sheet = unzip_part(&bytes, "xl/worksheets/sheet1.xml");
    let doc = roxmltree::Document::parse(&sheet).expect("escaped sheet parses");
    assert!(
        doc.descendants()
            .filter(|n| n.has_tag_name("t"))
            .any(|n| n.text() == Some("R&D <North> \"Ops\""))
    );
}

#[test]
fn workbook_without_pictures_has_no_drawing() {
    let bytes = sop_report::render_xlsx(&SopRecord::default(), &RenderOptions::default())
        .expect("render empty record");
    let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).expect("open xlsx");
    assert!(archive.file_names().all(|n| !n.starts_with("xl/drawings")));
    let sheet = unzip_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(!sheet.contains("<drawing"));
}
