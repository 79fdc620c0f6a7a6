use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde::Deserialize;
use sop_report::model::{
    GuidanceItem, ProcessImage, Remark, Revision, SafetyItem, SignerRole, SopHeader, Step,
};
use sop_report::{Error, FontSource, PageOverflow, RenderOptions, SopRecord};

/// Render an SOP manifest as a PDF page document and/or an XLSX sheet
#[derive(Parser, Debug)]
#[command(name = "sop-report")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON manifest; image paths are relative to it
    manifest: PathBuf,

    /// Write the page form here
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Write the grid form here
    #[arg(long)]
    xlsx: Option<PathBuf>,

    /// TrueType font to embed in the PDF instead of Helvetica
    #[arg(long)]
    font: Option<PathBuf>,

    /// Bold companion of --font
    #[arg(long, requires = "font")]
    bold_font: Option<PathBuf>,

    /// Start new pages instead of drawing past the bottom margin
    #[arg(long)]
    paginate: bool,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct Manifest {
    header: SopHeader,
    steps: Vec<Step>,
    images: Vec<ImageEntry>,
    dos: Vec<GuidanceEntry>,
    donts: Vec<GuidanceEntry>,
    quality_inspection: Vec<GuidanceEntry>,
    safety_items: Vec<SafetyEntry>,
    revision_history: Vec<Revision>,
    remarks: Vec<RemarkEntry>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ImageEntry {
    caption: String,
    image: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GuidanceEntry {
    text: String,
    image: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct SafetyEntry {
    sl_no: Option<String>,
    requirement: String,
    remarks: String,
    image: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RemarkEntry {
    role: String,
    name: String,
}

/// Reads an image next to the manifest; unreadable files count as absent.
fn load_image(base: &Path, path: Option<&PathBuf>) -> Option<Vec<u8>> {
    let full = base.join(path?);
    match std::fs::read(&full) {
        Ok(data) => Some(data),
        Err(e) => {
            log::warn!("Cannot read image {}: {e}", full.display());
            None
        }
    }
}

fn load_record(manifest_path: &Path) -> Result<SopRecord, Error> {
    let text = std::fs::read_to_string(manifest_path)?;
    let manifest: Manifest = serde_json::from_str(&text)
        .map_err(|e| Error::InvalidRecord(format!("{}: {e}", manifest_path.display())))?;
    let base = manifest_path.parent().unwrap_or(Path::new("."));

    let guidance = |entries: Vec<GuidanceEntry>| -> Vec<GuidanceItem> {
        entries
            .into_iter()
            .map(|e| GuidanceItem {
                image_data: load_image(base, e.image.as_ref()),
                text: e.text,
            })
            .collect()
    };

    let mut remarks = Vec::with_capacity(manifest.remarks.len());
    for entry in manifest.remarks {
        let role = SignerRole::from_label(&entry.role).ok_or_else(|| {
            Error::InvalidRecord(format!("unknown signer role {:?}", entry.role))
        })?;
        remarks.push(Remark {
            role,
            name: entry.name,
        });
    }

    Ok(SopRecord {
        header: manifest.header,
        steps: manifest.steps,
        images: manifest
            .images
            .into_iter()
            .map(|e| ProcessImage {
                image_data: load_image(base, e.image.as_ref()).unwrap_or_default(),
                caption: e.caption,
            })
            .collect(),
        dos: guidance(manifest.dos),
        donts: guidance(manifest.donts),
        quality_inspection: guidance(manifest.quality_inspection),
        safety_items: manifest
            .safety_items
            .into_iter()
            .map(|e| SafetyItem {
                image_data: load_image(base, e.image.as_ref()),
                sl_no: e.sl_no,
                requirement: e.requirement,
                remarks: e.remarks,
            })
            .collect(),
        revision_history: manifest.revision_history,
        remarks,
    })
}

fn run(args: Args) -> Result<(), Error> {
    let record = load_record(&args.manifest)?;
    let options = RenderOptions {
        font: match args.font {
            Some(regular) => FontSource::TrueType {
                regular,
                bold: args.bold_font,
            },
            None => FontSource::Builtin,
        },
        page_overflow: if args.paginate {
            PageOverflow::Paginate
        } else {
            PageOverflow::Overlap
        },
    };

    let (pdf, xlsx) = match (args.pdf, args.xlsx) {
        (None, None) => (
            Some(args.manifest.with_extension("pdf")),
            Some(args.manifest.with_extension("xlsx")),
        ),
        other => other,
    };
    if let Some(path) = pdf {
        sop_report::write_pdf(&record, &path, &options)?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = xlsx {
        sop_report::write_xlsx(&record, &path, &options)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
