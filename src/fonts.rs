use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::error::Error;
use crate::layout::TextMeasure;

/// Where the page form takes its fonts from.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FontSource {
    /// The standard Helvetica pair, not embedded.
    #[default]
    Builtin,
    /// TrueType/OpenType files, embedded and subset. Without a bold file the
    /// regular face is used for bold styles too.
    TrueType {
        regular: PathBuf,
        bold: Option<PathBuf>,
    },
}

/// Advance widths used to measure, wrap and align text.
#[derive(Clone, Debug)]
pub struct FontMetrics {
    /// Widths in 1000-units for WinAnsi bytes 32..=255.
    widths_1000: Vec<f32>,
}

/// Width assumed for characters the WinAnsi table cannot look up.
const FALLBACK_WIDTH_1000: f32 = 556.0;

impl FontMetrics {
    pub fn helvetica() -> Self {
        Self {
            widths_1000: helvetica_widths(),
        }
    }

    fn from_face(face: &Face) -> Self {
        let units = face.units_per_em() as f32;
        let widths_1000 = (32u8..=255u8)
            .map(|byte| {
                face.glyph_index(winansi_to_char(byte))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0)
            })
            .collect();
        Self { widths_1000 }
    }

    pub fn char_width_1000(&self, ch: char) -> f32 {
        match char_to_winansi(ch) {
            0 => FALLBACK_WIDTH_1000,
            byte => self.widths_1000[(byte - 32) as usize],
        }
    }
}

impl TextMeasure for FontMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }
}

/// Regular and bold metrics of the page font pair.
#[derive(Clone, Debug)]
pub struct FontPairMetrics {
    pub regular: FontMetrics,
    pub bold: FontMetrics,
}

impl TextMeasure for FontPairMetrics {
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

fn map_font_file(path: &Path) -> Result<Mmap, Error> {
    let file = File::open(path)?;
    // The mapping is read-only and dropped with the font.
    let data = unsafe { Mmap::map(&file) }?;
    Ok(data)
}

/// A font resource of one PDF document. TrueType fonts collect the glyphs
/// they are asked to encode and are subset when written.
pub(crate) struct PdfFont {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    pub(crate) metrics: FontMetrics,
    program: FontProgram,
}

enum FontProgram {
    Builtin(&'static [u8]),
    TrueType(Box<TrueTypeProgram>),
}

struct TrueTypeProgram {
    data: Mmap,
    ps_name: String,
    remapper: subsetter::GlyphRemapper,
    char_to_gid: HashMap<char, u16>,
}

impl PdfFont {
    pub(crate) fn builtin(pdf_name: String, font_ref: Ref, bold: bool) -> Self {
        let base: &'static [u8] = if bold { b"Helvetica-Bold" } else { b"Helvetica" };
        Self {
            pdf_name,
            font_ref,
            metrics: FontMetrics::helvetica(),
            program: FontProgram::Builtin(base),
        }
    }

    pub(crate) fn truetype(pdf_name: String, font_ref: Ref, path: &Path) -> Result<Self, Error> {
        let data = map_font_file(path)?;
        let (metrics, ps_name) = {
            let face = Face::parse(&data, 0)
                .map_err(|e| Error::Font(format!("{}: {e}", path.display())))?;
            let ps_name = face
                .names()
                .into_iter()
                .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME && n.is_unicode())
                .and_then(|n| n.to_string())
                .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_else(|| pdf_name.clone())
                .replace(' ', "");
            (FontMetrics::from_face(&face), ps_name)
        };
        Ok(Self {
            pdf_name,
            font_ref,
            metrics,
            program: FontProgram::TrueType(Box::new(TrueTypeProgram {
                data,
                ps_name,
                remapper: subsetter::GlyphRemapper::new(),
                char_to_gid: HashMap::new(),
            })),
        })
    }

    /// Loads the font `source` names for the given weight, falling back to
    /// the builtin Helvetica on any failure.
    pub(crate) fn from_source(source: &FontSource, pdf_name: String, font_ref: Ref, bold: bool) -> Self {
        let path = match source {
            FontSource::Builtin => return Self::builtin(pdf_name, font_ref, bold),
            FontSource::TrueType { regular, bold: bold_path } => match (bold, bold_path) {
                (true, Some(b)) => b,
                _ => regular,
            },
        };
        Self::truetype(pdf_name.clone(), font_ref, path).unwrap_or_else(|e| {
            log::warn!("Font {} unusable: {e}, using Helvetica", path.display());
            Self::builtin(pdf_name, font_ref, bold)
        })
    }

    /// Bytes for a `Tj` string in this font's encoding.
    pub(crate) fn encode(&mut self, text: &str) -> Vec<u8> {
        match &mut self.program {
            FontProgram::Builtin(_) => to_winansi_bytes(text),
            FontProgram::TrueType(tt) => tt.encode(text),
        }
    }

    pub(crate) fn write(&self, pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref) {
        match &self.program {
            FontProgram::Builtin(base) => {
                pdf.type1_font(self.font_ref)
                    .base_font(Name(*base))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
            }
            FontProgram::TrueType(tt) => {
                if !tt.write(pdf, self.font_ref, alloc) {
                    log::warn!("Embedding {} failed, using Helvetica", tt.ps_name);
                    pdf.type1_font(self.font_ref)
                        .base_font(Name(b"Helvetica"))
                        .encoding_predefined(Name(b"WinAnsiEncoding"));
                }
            }
        }
    }
}

impl TrueTypeProgram {
    /// Encodes as big-endian 2-byte glyph IDs of the subset font, remapping
    /// each new glyph on first use.
    fn encode(&mut self, text: &str) -> Vec<u8> {
        let Ok(face) = Face::parse(&self.data, 0) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let gid = match self.char_to_gid.get(&ch) {
                Some(&gid) => gid,
                None => {
                    let gid = face
                        .glyph_index(ch)
                        .map(|g| self.remapper.remap(g.0))
                        .unwrap_or(0);
                    self.char_to_gid.insert(ch, gid);
                    gid
                }
            };
            out.extend(gid.to_be_bytes());
        }
        out
    }

    /// Writes a Type0 font with an Identity-H CIDFont descendant and a
    /// ToUnicode map. Returns false when the font data no longer parses.
    fn write(&self, pdf: &mut Pdf, font_ref: Ref, alloc: &mut impl FnMut() -> Ref) -> bool {
        let Ok(face) = Face::parse(&self.data, 0) else {
            return false;
        };
        let units = face.units_per_em() as f32;
        let to_1000 = |v: f32| v / units * 1000.0;

        let subset_data = subsetter::subset(&self.data, 0, &self.remapper).unwrap_or_else(|e| {
            log::warn!("Font subsetting failed for {}: {e}, embedding the full font", self.ps_name);
            self.data.to_vec()
        });
        let Ok(data_len) = i32::try_from(subset_data.len()) else {
            return false;
        };

        let descriptor_ref = alloc();
        let data_ref = alloc();
        let cid_font_ref = alloc();
        let tounicode_ref = alloc();
        let ps_name = self.ps_name.as_bytes();

        pdf.stream(data_ref, &subset_data)
            .pair(Name(b"Length1"), data_len);

        let bb = face.global_bounding_box();
        pdf.font_descriptor(descriptor_ref)
            .name(Name(ps_name))
            .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
            .bbox(Rect::new(
                to_1000(bb.x_min as f32),
                to_1000(bb.y_min as f32),
                to_1000(bb.x_max as f32),
                to_1000(bb.y_max as f32),
            ))
            .italic_angle(0.0)
            .ascent(to_1000(face.ascender() as f32))
            .descent(to_1000(face.descender() as f32))
            .cap_height(face.capital_height().map(|h| to_1000(h as f32)).unwrap_or(700.0))
            .stem_v(80.0)
            .font_file2(data_ref);

        let system_info = || pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        };
        {
            let mut cid = pdf.cid_font(cid_font_ref);
            cid.subtype(pdf_writer::types::CidFontType::Type2);
            cid.base_font(Name(ps_name));
            cid.system_info(system_info());
            cid.font_descriptor(descriptor_ref);
            cid.default_width(0.0);
            cid.cid_to_gid_map_predefined(Name(b"Identity"));
            let mut gid_widths: Vec<(u16, f32)> = self
                .char_to_gid
                .iter()
                .filter(|&(_, &gid)| gid != 0)
                .filter_map(|(&ch, &gid)| {
                    face.glyph_index(ch)
                        .and_then(|g| face.glyph_hor_advance(g))
                        .map(|adv| (gid, to_1000(adv as f32)))
                })
                .collect();
            gid_widths.sort_by_key(|&(gid, _)| gid);
            gid_widths.dedup_by_key(|&mut (gid, _)| gid);
            if !gid_widths.is_empty() {
                let mut w = cid.widths();
                for &(gid, width) in &gid_widths {
                    w.consecutive(gid, [width]);
                }
            }
        }

        let cmap_name = format!("{}-UTF16", self.ps_name);
        let mut cmap = pdf_writer::types::UnicodeCmap::new(Name(cmap_name.as_bytes()), system_info());
        for (&ch, &gid) in &self.char_to_gid {
            if gid != 0 {
                cmap.pair(gid, ch);
            }
        }
        pdf.stream(tounicode_ref, cmap.finish().as_slice());

        pdf.type0_font(font_ref)
            .base_font(Name(ps_name))
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(cid_font_ref)
            .to_unicode(tounicode_ref);
        true
    }
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their Unicode codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95, // bullet
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// WinAnsi bytes for a PDF string; unmappable characters become `?`.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match char_to_winansi(c) {
            0 => b'?',
            b => b,
        })
        .collect()
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                          // space
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 | 74 => 278.0,                     // I J (narrow uppercase)
            77 => 833.0,                          // M (wide)
            65..=90 => 667.0,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
            109 | 119 => 833.0,                   // m w (wide)
            97..=122 => 556.0,                    // lowercase a-z (average)
            0x95 => 350.0,                        // bullet
            _ => 556.0,
        })
        .collect()
}
