use crate::model::{GuidanceItem, ProcessImage, SopRecord};

use super::{Lane, PlacedRegion, RegionAllocator, Section, Span, Style, tile_columns};

const BANNER_ROW_HEIGHT: f32 = 18.0;
const MIN_CAPTION_HEIGHT: f32 = 14.0;
const DONT_MARKER: &str = "\u{2022} ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuidanceKind {
    Do,
    Dont,
    Quality,
}

#[derive(Clone, Copy, Debug)]
pub struct GuidanceTile<'a> {
    pub kind: GuidanceKind,
    pub item: &'a GuidanceItem,
}

impl<'a> GuidanceTile<'a> {
    pub fn caption(&self) -> String {
        match self.kind {
            GuidanceKind::Dont => format!("{DONT_MARKER}{}", self.item.text.trim()),
            GuidanceKind::Do | GuidanceKind::Quality => self.item.text.trim().to_string(),
        }
    }

    fn style(&self) -> Style {
        match self.kind {
            GuidanceKind::Dont => Style::Alert,
            GuidanceKind::Do | GuidanceKind::Quality => Style::Caption,
        }
    }

    fn image(&self) -> Option<&'a [u8]> {
        let item: &'a GuidanceItem = self.item;
        item.image_data.as_deref().filter(|d| !d.is_empty())
    }
}

/// Alternates do, don't, do, don't... while both lists last, then drains the
/// longer one in its original order.
pub fn interleave_dos_donts<'a>(
    dos: &'a [GuidanceItem],
    donts: &'a [GuidanceItem],
) -> Vec<GuidanceTile<'a>> {
    let mut out = Vec::with_capacity(dos.len() + donts.len());
    for i in 0..dos.len().max(donts.len()) {
        if let Some(item) = dos.get(i) {
            out.push(GuidanceTile {
                kind: GuidanceKind::Do,
                item,
            });
        }
        if let Some(item) = donts.get(i) {
            out.push(GuidanceTile {
                kind: GuidanceKind::Dont,
                item,
            });
        }
    }
    out
}

/// Caption under a process image, prefixed with the step it belongs to.
/// Images pair with steps by position.
fn combined_caption(record: &SopRecord, index: usize, image: &ProcessImage) -> String {
    let caption = image.caption.trim();
    match record.steps.get(index) {
        Some(step) if !step.step_no.trim().is_empty() => {
            let text = if caption.is_empty() {
                step.description.trim()
            } else {
                caption
            };
            format!("Step {}: {text}", step.step_no.trim())
        }
        _ => caption.to_string(),
    }
}

/// Tallest caption height among the tiles sharing one tile row.
fn caption_row_height<'s>(
    alloc: &RegionAllocator,
    captions: impl Iterator<Item = (&'s str, Style)>,
    tiles: &[Span],
) -> f32 {
    captions
        .zip(tiles)
        .map(|((caption, style), cols)| alloc.text_height(caption, *cols, style))
        .fold(MIN_CAPTION_HEIGHT, f32::max)
}

/// Left lane: process images tiled per the profile, captions beneath.
pub(super) fn build_images<'a>(
    record: &'a SopRecord,
    alloc: &mut RegionAllocator,
    lane: &mut Lane,
) -> Vec<PlacedRegion<'a>> {
    let profile = *alloc.profile();
    let mut out = Vec::new();

    let banner = alloc.reserve_lane_rows(lane, 1, BANNER_ROW_HEIGHT);
    out.push(PlacedRegion::text(
        Section::Images,
        banner,
        lane.cols(),
        "PROCESS IMAGES",
        Style::Banner,
    ));

    let per_row = profile.images_per_row;
    let tiles = tile_columns(lane.cols(), per_row);
    for (chunk_idx, chunk) in record.images.chunks(per_row).enumerate() {
        let captions: Vec<String> = chunk
            .iter()
            .enumerate()
            .map(|(i, img)| combined_caption(record, chunk_idx * per_row + i, img))
            .collect();
        let caption_h = caption_row_height(
            alloc,
            captions.iter().map(|c| (c.as_str(), Style::Caption)),
            &tiles,
        );

        let image_rows = alloc.reserve_lane_rows(lane, 1, profile.image_row_height);
        let caption_rows = alloc.reserve_lane_rows(lane, 1, caption_h);
        for ((img, caption), cols) in chunk.iter().zip(captions).zip(&tiles) {
            if !img.image_data.is_empty() {
                out.push(alloc.image_region(Section::Images, image_rows, *cols, &img.image_data));
            }
            out.push(PlacedRegion::text(
                Section::Images,
                caption_rows,
                *cols,
                caption,
                Style::Caption,
            ));
        }
    }

    out
}

/// Right lane: interleaved do's and don'ts, then the quality-inspection
/// sub-panel when the record has one.
pub(super) fn build_guidance<'a>(
    record: &'a SopRecord,
    alloc: &mut RegionAllocator,
    lane: &mut Lane,
) -> Vec<PlacedRegion<'a>> {
    let profile = *alloc.profile();
    let mut out = Vec::new();

    let banner = alloc.reserve_lane_rows(lane, 1, BANNER_ROW_HEIGHT);
    out.push(PlacedRegion::text(
        Section::Guidance,
        banner,
        lane.cols(),
        "DO'S & DON'TS",
        Style::Banner,
    ));
    let tiles = interleave_dos_donts(&record.dos, &record.donts);
    place_tiles(alloc, lane, &tiles, profile.guidance_per_row, &mut out);

    if !record.quality_inspection.is_empty() {
        let banner = alloc.reserve_lane_rows(lane, 1, BANNER_ROW_HEIGHT);
        out.push(PlacedRegion::text(
            Section::Guidance,
            banner,
            lane.cols(),
            "QUALITY INSPECTION",
            Style::Banner,
        ));
        let tiles: Vec<GuidanceTile> = record
            .quality_inspection
            .iter()
            .map(|item| GuidanceTile {
                kind: GuidanceKind::Quality,
                item,
            })
            .collect();
        place_tiles(alloc, lane, &tiles, profile.quality_per_row, &mut out);
    }

    out
}

/// One tile row per `per_row` items: an image row (only when some tile in
/// the row has a picture) and a caption row.
fn place_tiles<'a>(
    alloc: &mut RegionAllocator,
    lane: &mut Lane,
    items: &[GuidanceTile<'a>],
    per_row: usize,
    out: &mut Vec<PlacedRegion<'a>>,
) {
    let tiles = tile_columns(lane.cols(), per_row);
    let image_height = alloc.profile().guidance_image_height;
    for chunk in items.chunks(per_row) {
        let captions: Vec<String> = chunk.iter().map(GuidanceTile::caption).collect();
        let caption_h = caption_row_height(
            alloc,
            captions.iter().zip(chunk).map(|(c, t)| (c.as_str(), t.style())),
            &tiles,
        );

        let image_rows = chunk
            .iter()
            .any(|t| t.image().is_some())
            .then(|| alloc.reserve_lane_rows(lane, 1, image_height));
        let caption_rows = alloc.reserve_lane_rows(lane, 1, caption_h);

        for ((tile, caption), cols) in chunk.iter().zip(captions).zip(&tiles) {
            if let (Some(rows), Some(data)) = (image_rows, tile.image()) {
                out.push(alloc.image_region(Section::Guidance, rows, *cols, data));
            }
            out.push(PlacedRegion::text(
                Section::Guidance,
                caption_rows,
                *cols,
                caption,
                tile.style(),
            ));
        }
    }
}
