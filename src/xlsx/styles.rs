use std::fmt::Write as _;

use super::{BorderWeight, CellFormat};
use crate::layout::{HAlign, Style, VAlign};

const BORDER_VARIANTS: usize = 3;

fn style_slot(style: Option<Style>) -> usize {
    style.map_or(0, |s| {
        1 + Style::ALL
            .iter()
            .position(|candidate| *candidate == s)
            .unwrap_or(0)
    })
}

fn border_slot(border: BorderWeight) -> usize {
    match border {
        BorderWeight::None => 0,
        BorderWeight::Thin => 1,
        BorderWeight::PageEdge => 2,
    }
}

/// Index into `cellXfs` for a format. Entry 0 is the workbook default; the
/// rest enumerate every (style, border) pair.
pub(super) fn xf_index(format: CellFormat) -> usize {
    1 + style_slot(format.style) * BORDER_VARIANTS + border_slot(format.border)
}

fn argb(color: [u8; 3]) -> String {
    format!("FF{:02X}{:02X}{:02X}", color[0], color[1], color[2])
}

/// `xl/styles.xml` with one font per [`Style`], a solid fill for every
/// filled style, three border variants and the cross product of them as
/// cell formats.
pub(super) fn styles_xml() -> String {
    let specs: Vec<_> = Style::ALL.iter().map(|s| s.spec()).collect();

    let mut fonts = String::from(r#"<font><sz val="11"/><name val="Calibri"/></font>"#);
    for spec in &specs {
        let bold = if spec.bold { "<b/>" } else { "" };
        let _ = write!(
            fonts,
            r#"<font>{bold}<sz val="{}"/><color rgb="{}"/><name val="Arial"/></font>"#,
            spec.font_size,
            argb(spec.color)
        );
    }

    // Fills 0 and 1 are reserved by the format.
    let mut fills = String::from(
        r#"<fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill>"#,
    );
    let mut fill_ids = Vec::with_capacity(specs.len());
    let mut fill_count = 2;
    for spec in &specs {
        match spec.fill {
            Some(color) => {
                let _ = write!(
                    fills,
                    r#"<fill><patternFill patternType="solid"><fgColor rgb="{}"/><bgColor indexed="64"/></patternFill></fill>"#,
                    argb(color)
                );
                fill_ids.push(fill_count);
                fill_count += 1;
            }
            None => fill_ids.push(0),
        }
    }

    let side = |name: &str, weight: &str| format!(r#"<{name} style="{weight}"><color auto="1"/></{name}>"#);
    let left = side("left", "thin");
    let borders = format!(
        "<border><left/><right/><top/><bottom/><diagonal/></border>\
         <border>{left}{}{}{}<diagonal/></border>\
         <border>{left}{}{}{}<diagonal/></border>",
        side("right", "thin"),
        side("top", "thin"),
        side("bottom", "thin"),
        side("right", "medium"),
        side("top", "thin"),
        side("bottom", "thin"),
    );

    let mut xfs = String::from(r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#);
    let mut xf_count = 1;
    for slot in 0..=specs.len() {
        for border_id in 0..BORDER_VARIANTS {
            let (font_id, fill_id, alignment) = match slot.checked_sub(1).map(|i| (i, &specs[i])) {
                None => (0, 0, String::new()),
                Some((i, spec)) => {
                    let horizontal = match spec.h_align {
                        HAlign::Left => "left",
                        HAlign::Center => "center",
                    };
                    let vertical = match spec.v_align {
                        VAlign::Top => "top",
                        VAlign::Center => "center",
                    };
                    (
                        i + 1,
                        fill_ids[i],
                        format!(
                            r#"<alignment horizontal="{horizontal}" vertical="{vertical}" wrapText="1"/>"#
                        ),
                    )
                }
            };
            let _ = write!(
                xfs,
                r#"<xf numFmtId="0" fontId="{font_id}" fillId="{fill_id}" borderId="{border_id}" xfId="0" applyFont="1" applyFill="1" applyBorder="1" applyAlignment="1">{alignment}</xf>"#
            );
            xf_count += 1;
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="{}">{fonts}</fonts><fills count="{fill_count}">{fills}</fills><borders count="{BORDER_VARIANTS}">{borders}</borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="{xf_count}">{xfs}</cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#,
        specs.len() + 1,
    )
}
