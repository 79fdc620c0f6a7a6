use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::styles::{styles_xml, xf_index};
use super::{CellFormat, GridSurface};
use crate::error::Error;
use crate::images::{self, ImageFormat};
use crate::layout::CELL_PADDING;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Points to EMU (English Metric Units) used by drawing anchors.
const EMU_PER_POINT: f32 = 12_700.0;
const DEFAULT_COLUMN_WIDTH: f32 = 48.0;
const DEFAULT_ROW_HEIGHT: f32 = 15.0;

/// Escape special XML characters
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Column letters for a zero-based index: 0 -> A, 25 -> Z, 26 -> AA.
pub(crate) fn column_name(mut col: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

pub(crate) fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", column_name(col), row + 1)
}

/// Column width in Excel character units for a width in points.
pub(crate) fn excel_column_width(points: f32) -> f32 {
    ((points / 0.75 - 5.0) / 7.0).max(0.0)
}

#[derive(Clone, Debug, Default)]
struct Cell {
    value: Option<String>,
    xf: usize,
}

#[derive(Clone, Debug)]
struct Picture {
    format: ImageFormat,
    data: Vec<u8>,
    top_left: (usize, usize),
    bottom_right: (usize, usize),
}

/// Single-sheet SpreadsheetML workbook, built in memory and packaged by
/// [`XlsxWorkbook::to_bytes`].
#[derive(Clone, Debug)]
pub struct XlsxWorkbook {
    sheet_name: String,
    column_widths: BTreeMap<usize, f32>,
    row_heights: BTreeMap<usize, f32>,
    cells: BTreeMap<(usize, usize), Cell>,
    merges: Vec<(usize, usize, usize, usize)>,
    pictures: Vec<Picture>,
}

impl XlsxWorkbook {
    pub fn new(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            column_widths: BTreeMap::new(),
            row_heights: BTreeMap::new(),
            cells: BTreeMap::new(),
            merges: Vec::new(),
            pictures: Vec::new(),
        }
    }

    pub fn merge_count(&self) -> usize {
        self.merges.len()
    }

    pub fn image_count(&self) -> usize {
        self.pictures.len()
    }

    pub fn cell_value(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(&(row, col)).and_then(|c| c.value.as_deref())
    }

    fn column_width(&self, col: usize) -> f32 {
        self.column_widths.get(&col).copied().unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    fn row_height(&self, row: usize) -> f32 {
        self.row_heights.get(&row).copied().unwrap_or(DEFAULT_ROW_HEIGHT)
    }

    /// Packages the workbook as `.xlsx` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let mut parts: Vec<(String, String)> = vec![
            ("[Content_Types].xml".into(), self.content_types_xml()),
            ("_rels/.rels".into(), root_rels_xml()),
            ("xl/workbook.xml".into(), self.workbook_xml()),
            ("xl/_rels/workbook.xml.rels".into(), workbook_rels_xml()),
            ("xl/styles.xml".into(), styles_xml()),
            ("xl/worksheets/sheet1.xml".into(), self.sheet_xml()),
        ];
        if !self.pictures.is_empty() {
            parts.push(("xl/worksheets/_rels/sheet1.xml.rels".into(), sheet_rels_xml()));
            parts.push(("xl/drawings/drawing1.xml".into(), self.drawing_xml()));
            parts.push((
                "xl/drawings/_rels/drawing1.xml.rels".into(),
                self.drawing_rels_xml(),
            ));
        }
        for (name, xml) in parts {
            zip.start_file(name, options)?;
            zip.write_all(xml.as_bytes())?;
        }
        for (i, picture) in self.pictures.iter().enumerate() {
            zip.start_file(media_name(i, picture.format), options)?;
            zip.write_all(&picture.data)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn content_types_xml(&self) -> String {
        let mut defaults = String::from(
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
        );
        for format in [ImageFormat::Png, ImageFormat::Jpeg] {
            if self.pictures.iter().any(|p| p.format == format) {
                let _ = write!(
                    defaults,
                    r#"<Default Extension="{}" ContentType="{}"/>"#,
                    format.extension(),
                    format.mime()
                );
            }
        }
        let mut overrides = String::from(
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );
        if !self.pictures.is_empty() {
            overrides.push_str(
                r#"<Override PartName="/xl/drawings/drawing1.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>"#,
            );
        }
        format!(
            r#"{XML_DECL}
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">{defaults}{overrides}</Types>"#
        )
    }

    fn workbook_xml(&self) -> String {
        format!(
            r#"{XML_DECL}
<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_REL}"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            xml_escape(&self.sheet_name)
        )
    }

    fn sheet_xml(&self) -> String {
        let mut xml = format!(
            r#"{XML_DECL}
<worksheet xmlns="{NS_MAIN}" xmlns:r="{NS_REL}"><sheetPr><pageSetUpPr fitToPage="1"/></sheetPr><sheetViews><sheetView workbookViewId="0" showGridLines="0"/></sheetViews><sheetFormatPr defaultRowHeight="{DEFAULT_ROW_HEIGHT}"/>"#
        );

        if !self.column_widths.is_empty() {
            xml.push_str("<cols>");
            for (col, width) in &self.column_widths {
                let _ = write!(
                    xml,
                    r#"<col min="{0}" max="{0}" width="{1:.2}" customWidth="1"/>"#,
                    col + 1,
                    excel_column_width(*width)
                );
            }
            xml.push_str("</cols>");
        }

        xml.push_str("<sheetData>");
        let mut rows: Vec<usize> = self
            .row_heights
            .keys()
            .copied()
            .chain(self.cells.keys().map(|(r, _)| *r))
            .collect();
        rows.sort_unstable();
        rows.dedup();
        for row in rows {
            match self.row_heights.get(&row) {
                Some(h) => {
                    let _ = write!(xml, r#"<row r="{}" ht="{h:.2}" customHeight="1">"#, row + 1);
                }
                None => {
                    let _ = write!(xml, r#"<row r="{}">"#, row + 1);
                }
            }
            for ((_, col), cell) in self.cells.range((row, 0)..(row + 1, 0)) {
                let r = cell_ref(row, *col);
                match &cell.value {
                    Some(v) => {
                        let _ = write!(
                            xml,
                            r#"<c r="{r}" s="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                            cell.xf,
                            xml_escape(v)
                        );
                    }
                    None => {
                        let _ = write!(xml, r#"<c r="{r}" s="{}"/>"#, cell.xf);
                    }
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData>");

        if !self.merges.is_empty() {
            let _ = write!(xml, r#"<mergeCells count="{}">"#, self.merges.len());
            for &(r1, c1, r2, c2) in &self.merges {
                let _ = write!(
                    xml,
                    r#"<mergeCell ref="{}:{}"/>"#,
                    cell_ref(r1, c1),
                    cell_ref(r2, c2)
                );
            }
            xml.push_str("</mergeCells>");
        }

        xml.push_str(
            r#"<pageMargins left="0.39" right="0.39" top="0.39" bottom="0.39" header="0" footer="0"/><pageSetup paperSize="9" orientation="landscape" fitToWidth="1" fitToHeight="0"/>"#,
        );
        if !self.pictures.is_empty() {
            xml.push_str(r#"<drawing r:id="rId1"/>"#);
        }
        xml.push_str("</worksheet>");
        xml
    }

    /// One two-cell anchor per picture, inset by the cell padding.
    fn drawing_xml(&self) -> String {
        let inset = (CELL_PADDING * EMU_PER_POINT) as i64;
        let mut xml = format!(
            r#"{XML_DECL}
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="{NS_REL}">"#
        );
        for (i, p) in self.pictures.iter().enumerate() {
            let (r1, c1) = p.top_left;
            let (r2, c2) = p.bottom_right;
            let col_end = ((self.column_width(c2) * EMU_PER_POINT) as i64 - inset).max(0);
            let row_end = ((self.row_height(r2) * EMU_PER_POINT) as i64 - inset).max(0);
            let _ = write!(
                xml,
                r#"<xdr:twoCellAnchor editAs="oneCell"><xdr:from><xdr:col>{c1}</xdr:col><xdr:colOff>{inset}</xdr:colOff><xdr:row>{r1}</xdr:row><xdr:rowOff>{inset}</xdr:rowOff></xdr:from><xdr:to><xdr:col>{c2}</xdr:col><xdr:colOff>{col_end}</xdr:colOff><xdr:row>{r2}</xdr:row><xdr:rowOff>{row_end}</xdr:rowOff></xdr:to><xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{}" name="Picture {}"/><xdr:cNvPicPr><a:picLocks noChangeAspect="1"/></xdr:cNvPicPr></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="rId{}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></xdr:spPr></xdr:pic><xdr:clientData/></xdr:twoCellAnchor>"#,
                i + 2,
                i + 1,
                i + 1
            );
        }
        xml.push_str("</xdr:wsDr>");
        xml
    }

    fn drawing_rels_xml(&self) -> String {
        let mut rels = String::new();
        for (i, p) in self.pictures.iter().enumerate() {
            let _ = write!(
                rels,
                r#"<Relationship Id="rId{}" Type="{NS_REL}/image" Target="../media/image{}.{}"/>"#,
                i + 1,
                i + 1,
                p.format.extension()
            );
        }
        format!(r#"{XML_DECL}
<Relationships xmlns="{NS_PKG_REL}">{rels}</Relationships>"#)
    }
}

fn media_name(index: usize, format: ImageFormat) -> String {
    format!("xl/media/image{}.{}", index + 1, format.extension())
}

fn root_rels_xml() -> String {
    format!(
        r#"{XML_DECL}
<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{NS_REL}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    )
}

fn workbook_rels_xml() -> String {
    format!(
        r#"{XML_DECL}
<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{NS_REL}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{NS_REL}/styles" Target="styles.xml"/></Relationships>"#
    )
}

fn sheet_rels_xml() -> String {
    format!(
        r#"{XML_DECL}
<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{NS_REL}/drawing" Target="../drawings/drawing1.xml"/></Relationships>"#
    )
}

impl GridSurface for XlsxWorkbook {
    fn set_column_width(&mut self, col: usize, width: f32) {
        self.column_widths.insert(col, width);
    }

    fn set_row_height(&mut self, row: usize, height: f32) {
        self.row_heights.insert(row, height);
    }

    fn set_cell_value(&mut self, row: usize, col: usize, value: &str) {
        self.cells.entry((row, col)).or_default().value = Some(value.to_string());
    }

    fn merge_cells(&mut self, first_row: usize, first_col: usize, last_row: usize, last_col: usize) {
        self.merges.push((first_row, first_col, last_row, last_col));
    }

    fn set_cell_style(&mut self, row: usize, col: usize, format: CellFormat) {
        self.cells.entry((row, col)).or_default().xf = xf_index(format);
    }

    fn place_image(
        &mut self,
        data: &[u8],
        top_left: (usize, usize),
        bottom_right: (usize, usize),
    ) -> Result<(), Error> {
        let info = images::sniff(data)
            .ok_or_else(|| Error::Image(format!("unrecognised image header ({} bytes)", data.len())))?;
        self.pictures.push(Picture {
            format: info.format,
            data: data.to_vec(),
            top_left,
            bottom_right,
        });
        Ok(())
    }
}
