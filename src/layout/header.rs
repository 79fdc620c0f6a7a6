use crate::model::{SignerRole, SopRecord};

use super::{Decoration, PlacedRegion, RegionAllocator, Section, Span, Style, split_columns};

const TITLE_ROW_HEIGHT: f32 = 20.0;
const FIELD_ROW_HEIGHT: f32 = 16.0;
const SPACER_ROW_HEIGHT: f32 = 6.0;

/// Label/value pairs per header line; each pair takes a third of the width.
const LABEL_COLS: usize = 8;
const VALUE_COLS: usize = 12;

/// Seven rows: a two-row title band, four rows of label/value triples and a
/// thin spacer.
pub(super) fn build<'a>(record: &'a SopRecord, alloc: &mut RegionAllocator) -> Vec<PlacedRegion<'a>> {
    let h = &record.header;
    let mut out = Vec::new();

    let title_rows = alloc.reserve_rows(2, TITLE_ROW_HEIGHT);
    let title_cols = split_columns(0, &[36, 24]);
    out.push(PlacedRegion::text(
        Section::Header,
        title_rows,
        title_cols[0],
        h.organization.trim(),
        Style::Title,
    ));
    out.push(PlacedRegion::text(
        Section::Header,
        title_rows,
        title_cols[1],
        "STANDARD OPERATING PROCEDURE",
        Style::Subtitle,
    ));

    // The unit is appended even when no time was given.
    let standard_time = format!("{} min", h.standard_time);
    let fields: [[(&str, String); 3]; 4] = [
        [
            ("Division", h.division.clone()),
            ("Activity", h.activity.clone()),
            ("SOP No.", h.sop_number.clone()),
        ],
        [
            ("Sub-Activity", h.sub_activity.clone()),
            ("Element", h.element.clone()),
            ("Date", h.date.clone()),
        ],
        [
            ("Standard Time", standard_time),
            ("Team Size", h.team_size.clone()),
            ("Technician Grade", h.technician_grade.clone()),
        ],
        SignerRole::ORDER.map(|role| (role.label(), record.signer_display(role))),
    ];

    for line in fields {
        let pair_cols: Vec<[Span; 2]> = (0..3)
            .map(|i| {
                let spans = split_columns(i * (LABEL_COLS + VALUE_COLS), &[LABEL_COLS, VALUE_COLS]);
                [spans[0], spans[1]]
            })
            .collect();
        let height = line
            .iter()
            .zip(&pair_cols)
            .map(|((label, value), [label_cols, value_cols])| {
                alloc
                    .text_height(label, *label_cols, Style::Label)
                    .max(alloc.text_height(value, *value_cols, Style::Value))
            })
            .fold(FIELD_ROW_HEIGHT, f32::max);
        let row = alloc.reserve_rows(1, height);
        for ((label, value), [label_cols, value_cols]) in line.into_iter().zip(pair_cols) {
            out.push(PlacedRegion::text(Section::Header, row, label_cols, label, Style::Label));
            out.push(PlacedRegion::text(Section::Header, row, value_cols, value, Style::Value));
        }
    }

    let spacer = alloc.reserve_rows(1, SPACER_ROW_HEIGHT);
    out.push(PlacedRegion::decoration(
        Section::Header,
        spacer,
        alloc.full_width(),
        Decoration::Spacer,
    ));

    out
}
