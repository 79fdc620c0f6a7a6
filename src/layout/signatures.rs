use crate::model::SopRecord;

use super::{PlacedRegion, RegionAllocator, Section, Span, Style, tile_columns};

/// Signers beyond this many still appear in the header's joined names but
/// get no box of their own.
pub const MAX_SIGNATURE_BOXES: usize = 4;

/// Shown in the single box rendered when the record has no signers at all.
pub const NO_SIGNERS_MARKER: &str = "[no signers recorded]";

const BANNER_ROW_HEIGHT: f32 = 18.0;
const NAME_ROW_HEIGHT: f32 = 20.0;
const ROLE_ROW_HEIGHT: f32 = 14.0;
const LINE_ROW_HEIGHT: f32 = 18.0;
const SIGNATURE_LINE: &str = "______________________";

pub(super) fn build<'a>(record: &'a SopRecord, alloc: &mut RegionAllocator) -> Vec<PlacedRegion<'a>> {
    let sec = Section::Signatures;
    let full = alloc.full_width();
    let mut out = Vec::new();

    let banner = alloc.reserve_rows(1, BANNER_ROW_HEIGHT);
    out.push(PlacedRegion::text(sec, banner, full, "APPROVALS", Style::Banner));

    let signers: Vec<(&str, &str)> = record
        .signer_groups()
        .iter()
        .flat_map(|g| g.names.iter().map(move |name| (g.role.label(), *name)))
        .collect();
    if signers.len() > MAX_SIGNATURE_BOXES {
        log::debug!(
            "{} signers, only the first {MAX_SIGNATURE_BOXES} get signature boxes",
            signers.len()
        );
    }

    let name_row = alloc.reserve_rows(1, NAME_ROW_HEIGHT);
    let role_row = alloc.reserve_rows(1, ROLE_ROW_HEIGHT);
    let line_row = alloc.reserve_rows(1, LINE_ROW_HEIGHT);

    if signers.is_empty() {
        log::warn!("SOP {:?} has no signers; rendering placeholder box", record.header.sop_number);
        out.push(PlacedRegion::text(
            sec,
            Span::new(name_row.start, line_row.end),
            full,
            NO_SIGNERS_MARKER,
            Style::Diagnostic,
        ));
        return out;
    }

    let boxed = &signers[..signers.len().min(MAX_SIGNATURE_BOXES)];
    for ((role, name), cols) in boxed.iter().zip(tile_columns(full, boxed.len())) {
        out.push(PlacedRegion::text(sec, name_row, cols, *name, Style::SignatureName));
        out.push(PlacedRegion::text(sec, role_row, cols, *role, Style::SignatureRole));
        out.push(PlacedRegion::text(sec, line_row, cols, SIGNATURE_LINE, Style::SignatureLine));
    }

    out
}
