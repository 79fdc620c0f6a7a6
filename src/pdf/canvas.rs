use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};

use super::{PageGeometry, PageSurface, TextStyle};
use crate::error::Error;
use crate::fonts::{FontMetrics, FontPairMetrics, FontSource, PdfFont};
use crate::images::{self, ImageFormat};

fn rgb(color: [u8; 3]) -> (f32, f32, f32) {
    (
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
    )
}

/// [`PageSurface`] backed by `pdf-writer`. Fonts are written when the
/// document is finished so TrueType subsets cover every glyph drawn.
pub struct PdfCanvas {
    pdf: Pdf,
    next_id: i32,
    catalog_ref: Ref,
    pages_ref: Ref,
    geometry: PageGeometry,
    pages: Vec<Content>,
    regular: PdfFont,
    bold: PdfFont,
    image_xobjects: Vec<(String, Ref)>,
}

impl PdfCanvas {
    pub fn new(geometry: PageGeometry, font: &FontSource) -> Self {
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };
        let catalog_ref = alloc();
        let pages_ref = alloc();
        let regular_ref = alloc();
        let bold_ref = alloc();
        let regular = PdfFont::from_source(font, "F1".to_string(), regular_ref, false);
        let bold = PdfFont::from_source(font, "F2".to_string(), bold_ref, true);
        Self {
            pdf: Pdf::new(),
            next_id,
            catalog_ref,
            pages_ref,
            geometry,
            pages: Vec::new(),
            regular,
            bold,
            image_xobjects: Vec::new(),
        }
    }

    /// Metrics of both weights, for measuring layout text.
    pub fn metrics(&self) -> FontPairMetrics {
        FontPairMetrics {
            regular: self.regular.metrics.clone(),
            bold: self.bold.metrics.clone(),
        }
    }

    pub fn metrics_for(&self, bold: bool) -> &FontMetrics {
        if bold { &self.bold.metrics } else { &self.regular.metrics }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn alloc(&mut self) -> Ref {
        let r = Ref::new(self.next_id);
        self.next_id += 1;
        r
    }

    fn content(&mut self) -> &mut Content {
        if self.pages.is_empty() {
            self.pages.push(Content::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Flips a top-left `y` into PDF user space.
    fn pdf_y(&self, y: f32) -> f32 {
        self.geometry.height - y
    }

    /// Writes the image as an XObject and returns its resource name. JPEG is
    /// passed through; PNG is decoded and stored as Flate RGB with an
    /// optional alpha soft mask.
    fn embed_image(&mut self, data: &[u8]) -> Result<String, Error> {
        let info = images::sniff(data)
            .ok_or_else(|| Error::Image(format!("unrecognised image header ({} bytes)", data.len())))?;
        let xobj_ref = self.alloc();
        let pdf_name = format!("Im{}", self.image_xobjects.len() + 1);

        match info.format {
            ImageFormat::Jpeg => {
                let mut xobj = self.pdf.image_xobject(xobj_ref, data);
                xobj.filter(Filter::DctDecode);
                xobj.width(info.pixel_width as i32);
                xobj.height(info.pixel_height as i32);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
            }
            ImageFormat::Png => {
                let cursor = std::io::Cursor::new(data);
                let reader = image::ImageReader::with_format(
                    std::io::BufReader::new(cursor),
                    image::ImageFormat::Png,
                );
                let decoded = reader
                    .decode()
                    .map_err(|e| Error::Image(format!("PNG decode failed: {e}")))?;
                let rgba: image::RgbaImage = decoded.to_rgba8();
                let (w, h) = (rgba.width(), rgba.height());
                let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

                let rgb_data: Vec<u8> = rgba
                    .pixels()
                    .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                    .collect();
                let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

                let smask_ref = if has_alpha {
                    let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                    let compressed_alpha =
                        miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
                    let mask_ref = self.alloc();
                    let mut mask = self.pdf.image_xobject(mask_ref, &compressed_alpha);
                    mask.filter(Filter::FlateDecode);
                    mask.width(w as i32);
                    mask.height(h as i32);
                    mask.color_space().device_gray();
                    mask.bits_per_component(8);
                    Some(mask_ref)
                } else {
                    None
                };

                let mut xobj = self.pdf.image_xobject(xobj_ref, &compressed_rgb);
                xobj.filter(Filter::FlateDecode);
                xobj.width(w as i32);
                xobj.height(h as i32);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
                if let Some(mask_ref) = smask_ref {
                    xobj.s_mask(mask_ref);
                }
            }
        }

        self.image_xobjects.push((pdf_name.clone(), xobj_ref));
        Ok(pdf_name)
    }

    /// Assembles catalog, page tree, fonts and resources and returns the
    /// document bytes. A canvas that never drew anything yields one blank page.
    pub fn finish(mut self) -> Vec<u8> {
        if self.pages.is_empty() {
            self.pages.push(Content::new());
        }
        let n = self.pages.len();
        let page_ids: Vec<Ref> = (0..n).map(|_| self.alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| self.alloc()).collect();

        let Self {
            mut pdf,
            mut next_id,
            catalog_ref,
            pages_ref,
            geometry,
            pages,
            regular,
            bold,
            image_xobjects,
        } = self;

        for (i, c) in pages.into_iter().enumerate() {
            let raw = c.finish();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
            pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
        }

        pdf.catalog(catalog_ref).pages(pages_ref);
        pdf.pages(pages_ref)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };
        regular.write(&mut pdf, &mut alloc);
        bold.write(&mut pdf, &mut alloc);
        let font_pairs = [
            (regular.pdf_name.as_str(), regular.font_ref),
            (bold.pdf_name.as_str(), bold.font_ref),
        ];

        for i in 0..n {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height))
                .parent(pages_ref)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            {
                let mut fonts = resources.fonts();
                for (name, font_ref) in &font_pairs {
                    fonts.pair(Name(name.as_bytes()), *font_ref);
                }
            }
            if !image_xobjects.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, xobj_ref) in &image_xobjects {
                    xobjects.pair(Name(name.as_bytes()), *xobj_ref);
                }
            }
        }

        pdf.finish()
    }
}

impl PageSurface for PdfCanvas {
    fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    fn add_page(&mut self) {
        self.pages.push(Content::new());
    }

    fn draw_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: [u8; 3]) {
        let bottom = self.pdf_y(y + h);
        let (r, g, b) = rgb(color);
        let c = self.content();
        c.save_state();
        c.set_fill_rgb(r, g, b);
        c.rect(x, bottom, w, h).fill_nonzero();
        c.restore_state();
    }

    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        let (y1, y2) = (self.pdf_y(y1), self.pdf_y(y2));
        let c = self.content();
        c.save_state();
        c.set_line_width(width);
        c.set_stroke_rgb(0.0, 0.0, 0.0);
        c.move_to(x1, y1);
        c.line_to(x2, y2);
        c.stroke();
        c.restore_state();
    }

    fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle) {
        let y = self.pdf_y(baseline);
        let font = if style.bold {
            &mut self.bold
        } else {
            &mut self.regular
        };
        let bytes = font.encode(text);
        let name = font.pdf_name.clone();
        let (r, g, b) = rgb(style.color);
        let c = self.content();
        c.save_state();
        c.set_fill_rgb(r, g, b);
        c.begin_text();
        c.set_font(Name(name.as_bytes()), style.font_size);
        c.next_line(x, y);
        c.show(Str(&bytes));
        c.end_text();
        c.restore_state();
    }

    fn draw_image(&mut self, data: &[u8], x: f32, y: f32, w: f32, h: f32) -> Result<(), Error> {
        let name = self.embed_image(data)?;
        let bottom = self.pdf_y(y + h);
        let c = self.content();
        c.save_state();
        c.transform([w, 0.0, 0.0, h, x, bottom]);
        c.x_object(Name(name.as_bytes()));
        c.restore_state();
        Ok(())
    }
}
