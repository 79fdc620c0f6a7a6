#![allow(dead_code)]

use std::io::Cursor;

use sop_report::model::{
    GuidanceItem, ProcessImage, Remark, Revision, SafetyItem, SignerRole, SopHeader, SopRecord,
    Step,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Solid-colour PNG, with transparency when `alpha < 255`.
pub fn png(width: u32, height: u32, rgb: [u8; 3], alpha: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([rgb[0], rgb[1], rgb[2], alpha]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg)
        .expect("encode jpeg");
    out.into_inner()
}

pub fn header() -> SopHeader {
    SopHeader {
        organization: "Northern Grid Maintenance".into(),
        division: "Distribution".into(),
        activity: "Transformer servicing".into(),
        sub_activity: "Oil sampling".into(),
        element: "Drain valve".into(),
        sop_number: "SOP-TR-014".into(),
        date: "2024-03-18".into(),
        standard_time: "45".into(),
        team_size: "3".into(),
        technician_grade: "T2".into(),
    }
}

pub fn step(no: u32, description: &str, minutes: &str) -> Step {
    Step {
        step_no: no.to_string(),
        description: description.into(),
        tools: "Spanner set".into(),
        time_min: minutes.into(),
        symbol: "Q".into(),
        quality_char: "Torque".into(),
        spec: "25 Nm".into(),
        reaction: "Re-tighten and report".into(),
    }
}

pub fn guidance(text: &str, image: Option<Vec<u8>>) -> GuidanceItem {
    GuidanceItem {
        text: text.into(),
        image_data: image,
    }
}

pub fn safety(requirement: &str, image: Option<Vec<u8>>) -> SafetyItem {
    SafetyItem {
        sl_no: None,
        requirement: requirement.into(),
        remarks: "Mandatory".into(),
        image_data: image,
    }
}

pub fn revision(no: u32) -> Revision {
    Revision {
        sl_no: no.to_string(),
        rev_no: format!("R{no}"),
        details: "Updated torque values".into(),
        reason: "Audit finding".into(),
        date: "2024-01-10".into(),
        remark: String::new(),
    }
}

pub fn remark(role: SignerRole, name: &str) -> Remark {
    Remark {
        role,
        name: name.into(),
    }
}

/// 2 images, 2 steps, 1 do, 1 don't, 2 safety items, 1 revision and one
/// Prepared plus one Approved signer.
pub fn scenario_record() -> SopRecord {
    SopRecord {
        header: header(),
        steps: vec![
            step(1, "Isolate the transformer and verify zero voltage", "10"),
            step(2, "Open the drain valve and collect the sample", "15"),
        ],
        images: vec![
            ProcessImage {
                caption: "Isolation point".into(),
                image_data: png(40, 30, [200, 30, 30], 255),
            },
            ProcessImage {
                caption: String::new(),
                image_data: png(30, 40, [30, 200, 30], 255),
            },
        ],
        dos: vec![guidance("Wear insulated gloves", Some(png(20, 20, [0, 0, 255], 255)))],
        donts: vec![guidance("Do not open under load", None)],
        quality_inspection: Vec::new(),
        safety_items: vec![
            safety("Safety helmet", Some(png(16, 16, [255, 200, 0], 255))),
            safety("Insulated gloves", None),
        ],
        revision_history: vec![revision(1)],
        remarks: vec![
            remark(SignerRole::PreparedBy, "A. Rao"),
            remark(SignerRole::ApprovedBy, "M. Iyer"),
        ],
    }
}

/// Exercises every optional branch: quality items, many PPE pictures, more
/// signers than boxes and long wrapped text.
pub fn busy_record() -> SopRecord {
    let long = "Check the breather silica gel colour and replace it when more than two thirds \
                of the column has turned pink; record the reading in the maintenance log.";
    let mut record = scenario_record();
    record.steps = (1..=9)
        .map(|i| step(i, if i % 3 == 0 { long } else { "Inspect gasket" }, "5"))
        .collect();
    record.images = (0..7)
        .map(|i| ProcessImage {
            caption: format!("View {i}"),
            image_data: png(24 + i, 18, [10 * i as u8, 80, 160], 255),
        })
        .collect();
    record.dos = (0..3)
        .map(|i| guidance(&format!("Do item {i}"), Some(png(12, 12, [0, 150, 0], 255))))
        .collect();
    record.donts = vec![guidance("Never bypass the interlock", Some(png(12, 12, [200, 0, 0], 128)))];
    record.quality_inspection = (0..4)
        .map(|i| guidance(&format!("Quality point {i}"), None))
        .collect();
    record.safety_items = [
        "Safety helmet",
        "Safety shoes",
        "Insulated gloves",
        "Face shield",
        "Ear plugs",
        "Cutting pliers",
    ]
    .into_iter()
    .map(|r| safety(r, Some(png(16, 16, [90, 90, 90], 255))))
    .collect();
    record.revision_history = (1..=5).map(revision).collect();
    record.remarks = vec![
        remark(SignerRole::ApprovedBy, "M. Iyer"),
        remark(SignerRole::PreparedBy, "A. Rao"),
        remark(SignerRole::ReviewedBy, "K. Das"),
        remark(SignerRole::PreparedBy, "S. Pillai"),
        remark(SignerRole::ApprovedBy, "R. Menon"),
        remark(SignerRole::ReviewedBy, "T. Bose"),
    ];
    record
}
