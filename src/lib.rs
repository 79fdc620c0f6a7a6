pub mod classify;
mod error;
mod fonts;
pub mod images;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod xlsx;

pub use classify::{Category, classify};
pub use error::Error;
pub use fonts::{FontMetrics, FontPairMetrics, FontSource};
pub use layout::{CharEstimate, Layout, LayoutProfile, TextMeasure, compose};
pub use model::SopRecord;
pub use pdf::{PageGeometry, PageOverflow, PageSurface, PdfCanvas, render_to_page};
pub use xlsx::{GridSurface, XlsxWorkbook, render_to_grid};

use std::path::Path;
use std::time::Instant;

/// Sheet name of the grid form.
const SHEET_NAME: &str = "SOP";

/// Knobs shared by both output forms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOptions {
    pub font: FontSource,
    pub page_overflow: PageOverflow,
}

/// Page form as PDF bytes.
pub fn render_pdf(record: &SopRecord, options: &RenderOptions) -> Result<Vec<u8>, Error> {
    let t0 = Instant::now();
    let mut canvas = PdfCanvas::new(PageGeometry::a4_landscape(), &options.font);
    let metrics = canvas.metrics();
    let layout = compose(record, &LayoutProfile::page(), &metrics);
    let t_layout = t0.elapsed();

    let pages = render_to_page(&layout, &mut canvas, &metrics, options.page_overflow);
    let t_draw = t0.elapsed();

    let bytes = canvas.finish();
    let t_total = t0.elapsed();

    log::info!(
        "PDF phases: layout={:.1}ms ({} rows, {} regions), draw={:.1}ms ({pages} pages), assembly={:.1}ms",
        t_layout.as_secs_f64() * 1000.0,
        layout.rows(),
        layout.regions.len(),
        (t_draw - t_layout).as_secs_f64() * 1000.0,
        (t_total - t_draw).as_secs_f64() * 1000.0,
    );
    Ok(bytes)
}

/// Grid form as `.xlsx` bytes. Text is measured with the builtin Helvetica
/// metrics; the font option only affects the page form.
pub fn render_xlsx(record: &SopRecord, _options: &RenderOptions) -> Result<Vec<u8>, Error> {
    let t0 = Instant::now();
    let metrics = FontMetrics::helvetica();
    let layout = compose(record, &LayoutProfile::grid(), &metrics);
    let t_layout = t0.elapsed();

    let mut workbook = XlsxWorkbook::new(SHEET_NAME);
    let images = render_to_grid(&layout, &mut workbook);
    let bytes = workbook.to_bytes()?;
    let t_total = t0.elapsed();

    log::info!(
        "XLSX phases: layout={:.1}ms ({} rows, {} regions), package={:.1}ms ({images} images, {} merges)",
        t_layout.as_secs_f64() * 1000.0,
        layout.rows(),
        layout.regions.len(),
        (t_total - t_layout).as_secs_f64() * 1000.0,
        workbook.merge_count(),
    );
    Ok(bytes)
}

pub fn write_pdf(record: &SopRecord, output: &Path, options: &RenderOptions) -> Result<(), Error> {
    write_timed("PDF", output, || render_pdf(record, options))
}

pub fn write_xlsx(record: &SopRecord, output: &Path, options: &RenderOptions) -> Result<(), Error> {
    write_timed("XLSX", output, || render_xlsx(record, options))
}

fn write_timed(
    kind: &str,
    output: &Path,
    render: impl FnOnce() -> Result<Vec<u8>, Error>,
) -> Result<(), Error> {
    let t0 = Instant::now();
    let bytes = render()?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "{kind} timing: render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_render.as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );
    Ok(())
}
