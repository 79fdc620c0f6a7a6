use crate::classify::classify;
use crate::model::{SafetyItem, SopRecord};

use super::{PlacedRegion, RegionAllocator, Section, Span, Style, split_columns, tile_columns};

const BANNER_ROW_HEIGHT: f32 = 18.0;
const HEADER_ROW_HEIGHT: f32 = 16.0;
const TOTAL_ROW_HEIGHT: f32 = 20.0;
const SAFETY_ROW_HEIGHT: f32 = 20.0;
const REVISION_ROW_HEIGHT: f32 = 16.0;

const STEP_COLS: [usize; 8] = [3, 18, 8, 4, 4, 8, 8, 7];
const STEP_HEADERS: [&str; 8] = [
    "Step No.",
    "Description",
    "Tools",
    "Time (min)",
    "Symbol",
    "Characteristic",
    "Specification",
    "Reaction Plan",
];

const SAFETY_COLS: [usize; 3] = [4, 20, 12];
const PPE_COLS: usize = 24;
const MAX_PPE_IMAGES: usize = 5;
/// Images in the first PPE group; the rest go into a second, centred group.
const PPE_GROUP_SIZE: usize = 4;
const PPE_IMAGE_ROWS: usize = 3;

const REVISION_COLS: [usize; 6] = [4, 6, 22, 14, 6, 8];
pub const MIN_REVISION_ROWS: usize = 3;

fn format_minutes(total: f64) -> String {
    if total.fract().abs() < 1e-9 {
        format!("{total:.0}")
    } else {
        let s = format!("{total:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Sum of the parseable step times, or the header's standard time when no
/// step carries a number.
fn total_minutes(record: &SopRecord) -> String {
    let parsed: Vec<f64> = record
        .steps
        .iter()
        .filter_map(|s| s.time_min.trim().parse::<f64>().ok())
        .collect();
    if parsed.is_empty() {
        record.header.standard_time.trim().to_string()
    } else {
        format_minutes(parsed.iter().sum())
    }
}

pub(super) fn build_steps<'a>(record: &'a SopRecord, alloc: &mut RegionAllocator) -> Vec<PlacedRegion<'a>> {
    let sec = Section::Steps;
    let cols = split_columns(0, &STEP_COLS);
    let mut out = Vec::new();

    if alloc.profile().step_header_rows >= 2 {
        // Symbol, characteristic and specification share a parent heading.
        let rows = alloc.reserve_rows(2, HEADER_ROW_HEIGHT);
        for i in [0, 1, 2, 3, 7] {
            out.push(PlacedRegion::text(sec, rows, cols[i], STEP_HEADERS[i], Style::TableHeader));
        }
        out.push(PlacedRegion::text(
            sec,
            Span::single(rows.start),
            Span::new(cols[4].start, cols[6].end),
            "Symbol / Characteristics",
            Style::TableHeader,
        ));
        for i in [4, 5, 6] {
            out.push(PlacedRegion::text(
                sec,
                Span::single(rows.end),
                cols[i],
                STEP_HEADERS[i],
                Style::TableHeader,
            ));
        }
    } else {
        let row = alloc.reserve_rows(1, HEADER_ROW_HEIGHT);
        for (span, label) in cols.iter().zip(STEP_HEADERS) {
            out.push(PlacedRegion::text(sec, row, *span, label, Style::TableHeader));
        }
    }

    let step_height = alloc.profile().step_row_height;
    for step in &record.steps {
        let row = alloc.reserve_rows(1, step_height);
        let cells = [
            (&step.step_no, Style::BodyCenter),
            (&step.description, Style::Body),
            (&step.tools, Style::Body),
            (&step.time_min, Style::BodyCenter),
            (&step.symbol, Style::BodyCenter),
            (&step.quality_char, Style::Body),
            (&step.spec, Style::Body),
            (&step.reaction, Style::Body),
        ];
        for ((value, style), span) in cells.into_iter().zip(&cols) {
            out.push(PlacedRegion::text(sec, row, *span, value.trim(), style));
        }
    }

    let row = alloc.reserve_rows(1, TOTAL_ROW_HEIGHT);
    out.push(PlacedRegion::text(
        sec,
        row,
        Span::new(cols[0].start, cols[2].end),
        "TOTAL STANDARD TIME",
        Style::Total,
    ));
    out.push(PlacedRegion::text(sec, row, cols[3], total_minutes(record), Style::Total));
    out.push(PlacedRegion::text(
        sec,
        row,
        Span::new(cols[4].start, cols[7].end),
        format!("Team Size: {}", record.header.team_size.trim()),
        Style::Total,
    ));

    out
}

/// Caption under a PPE picture: the classified category when the requirement
/// names a known item, the requirement itself otherwise.
fn ppe_caption(item: &SafetyItem) -> String {
    classify(&item.requirement)
        .map(|c| c.label().to_string())
        .unwrap_or_else(|| item.requirement.trim().to_string())
}

/// Requirement rows on the left; PPE pictures overlay the same rows on the
/// right, anchored at the first requirement row.
pub(super) fn build_safety<'a>(record: &'a SopRecord, alloc: &mut RegionAllocator) -> Vec<PlacedRegion<'a>> {
    let sec = Section::Safety;
    let items = &record.safety_items;
    let cols = split_columns(0, &SAFETY_COLS);
    let left_end = cols[2].end;
    let ppe_cols = Span::new(left_end + 1, left_end + PPE_COLS);
    let mut out = Vec::new();

    let banner = alloc.reserve_rows(1, BANNER_ROW_HEIGHT);
    out.push(PlacedRegion::text(
        sec,
        banner,
        alloc.full_width(),
        "SAFETY REQUIREMENTS & PPE",
        Style::Banner,
    ));
    let header = alloc.reserve_rows(1, HEADER_ROW_HEIGHT);
    for (span, label) in cols.iter().zip(["Sl. No.", "Safety Requirement", "Remarks"]) {
        out.push(PlacedRegion::text(sec, header, *span, label, Style::TableHeader));
    }
    out.push(PlacedRegion::text(
        sec,
        header,
        ppe_cols,
        "Personal Protective Equipment",
        Style::TableHeader,
    ));

    let with_images: Vec<(&'a SafetyItem, &'a [u8])> = items
        .iter()
        .filter_map(|item| {
            item.image_data
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| (item, d))
        })
        .collect();
    if with_images.len() > MAX_PPE_IMAGES {
        log::debug!(
            "{} PPE images beyond the first {MAX_PPE_IMAGES} are not shown",
            with_images.len() - MAX_PPE_IMAGES
        );
    }
    let ppe = &with_images[..with_images.len().min(MAX_PPE_IMAGES)];
    let groups: Vec<&[(&SafetyItem, &[u8])]> = if ppe.len() > PPE_GROUP_SIZE {
        vec![&ppe[..PPE_GROUP_SIZE], &ppe[PPE_GROUP_SIZE..]]
    } else if !ppe.is_empty() {
        vec![ppe]
    } else {
        Vec::new()
    };

    // Each group's tiles and captions, worked out up front so the caption
    // row can be sized for them.
    let tile_width = ppe_cols.len() / PPE_GROUP_SIZE;
    let placed_groups: Vec<Vec<(Span, &'a [u8], String)>> = groups
        .iter()
        .map(|group| {
            // Short groups are centred within the PPE block.
            let offset = (PPE_GROUP_SIZE - group.len()) * tile_width / 2;
            let slots = tile_columns(
                Span::new(ppe_cols.start + offset, ppe_cols.start + offset + group.len() * tile_width - 1),
                group.len(),
            );
            group
                .iter()
                .zip(slots)
                .map(|((item, data), cols)| (cols, *data, ppe_caption(item)))
                .collect()
        })
        .collect();
    let caption_heights: Vec<f32> = placed_groups
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|(cols, _, caption)| alloc.text_height(caption, *cols, Style::Caption))
                .fold(0.0, f32::max)
        })
        .collect();

    // Enough rows for every requirement and for the pictures they overlay.
    let data_rows = items.len().max(groups.len() * (PPE_IMAGE_ROWS + 1));
    if data_rows == 0 {
        return out;
    }
    let mut first = None;
    for i in 0..data_rows {
        let height = items
            .get(i)
            .map(|item| {
                alloc
                    .text_height(&item.requirement, cols[1], Style::Body)
                    .max(alloc.text_height(&item.remarks, cols[2], Style::Body))
            })
            .unwrap_or(0.0)
            .max(if i % (PPE_IMAGE_ROWS + 1) == PPE_IMAGE_ROWS {
                caption_heights.get(i / (PPE_IMAGE_ROWS + 1)).copied().unwrap_or(0.0)
            } else {
                0.0
            })
            .max(SAFETY_ROW_HEIGHT);
        let row = alloc.reserve_rows(1, height);
        first.get_or_insert(row.start);

        let cells = match items.get(i) {
            Some(item) => [
                item.sl_no
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| (i + 1).to_string()),
                item.requirement.trim().to_string(),
                item.remarks.trim().to_string(),
            ],
            None => Default::default(),
        };
        let styles = [Style::BodyCenter, Style::Body, Style::Body];
        for ((value, span), style) in cells.into_iter().zip(&cols).zip(styles) {
            out.push(PlacedRegion::text(sec, row, *span, value, style));
        }
    }
    let Some(first) = first else {
        return out;
    };

    for (g, group) in placed_groups.into_iter().enumerate() {
        let top = first + g * (PPE_IMAGE_ROWS + 1);
        let image_rows = Span::new(top, top + PPE_IMAGE_ROWS - 1);
        let caption_row = Span::single(top + PPE_IMAGE_ROWS);
        for (cols, data, caption) in group {
            out.push(alloc.image_region(sec, image_rows, cols, data));
            out.push(PlacedRegion::text(sec, caption_row, cols, caption, Style::Caption));
        }
    }

    out
}

/// Banner, two-row nested header, then one row per revision, padded with
/// blank rows up to [`MIN_REVISION_ROWS`].
pub(super) fn build_revisions<'a>(
    record: &'a SopRecord,
    alloc: &mut RegionAllocator,
) -> Vec<PlacedRegion<'a>> {
    let sec = Section::Revisions;
    let cols = split_columns(0, &REVISION_COLS);
    let mut out = Vec::new();

    let banner = alloc.reserve_rows(1, BANNER_ROW_HEIGHT);
    out.push(PlacedRegion::text(
        sec,
        banner,
        alloc.full_width(),
        "REVISION HISTORY",
        Style::Banner,
    ));

    let header = alloc.reserve_rows(2, HEADER_ROW_HEIGHT);
    out.push(PlacedRegion::text(sec, header, cols[0], "Sl. No.", Style::TableHeader));
    out.push(PlacedRegion::text(
        sec,
        Span::single(header.start),
        Span::new(cols[1].start, cols[4].end),
        "Revision",
        Style::TableHeader,
    ));
    out.push(PlacedRegion::text(sec, header, cols[5], "Remarks", Style::TableHeader));
    for (span, label) in cols[1..5]
        .iter()
        .zip(["Revision No.", "Details", "Reason", "Date"])
    {
        out.push(PlacedRegion::text(
            sec,
            Span::single(header.end),
            *span,
            label,
            Style::TableHeader,
        ));
    }

    let entries = &record.revision_history;
    let total = entries.len().max(MIN_REVISION_ROWS);
    for i in 0..total {
        let values: [String; 6] = match entries.get(i) {
            Some(rev) => [
                &rev.sl_no,
                &rev.rev_no,
                &rev.details,
                &rev.reason,
                &rev.date,
                &rev.remark,
            ]
            .map(|v| v.trim().to_string()),
            None => Default::default(),
        };
        let height = values
            .iter()
            .zip(&cols)
            .map(|(v, span)| alloc.text_height(v, *span, Style::Body))
            .fold(REVISION_ROW_HEIGHT, f32::max);
        let row = alloc.reserve_rows(1, height);
        let styles = [
            Style::BodyCenter,
            Style::BodyCenter,
            Style::Body,
            Style::Body,
            Style::BodyCenter,
            Style::Body,
        ];
        for ((value, span), style) in values.into_iter().zip(&cols).zip(styles) {
            out.push(PlacedRegion::text(sec, row, *span, value, style));
        }
    }

    out
}
