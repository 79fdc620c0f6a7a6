//! Keyword classifier that tags free-text tool and PPE descriptions.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Cutters,
    Pliers,
    Helmet,
    Vest,
    Gloves,
    Goggles,
    Shoes,
    Mask,
    FaceShield,
    EarProtection,
    Harness,
    Vernier,
    Temperature,
    Hammer,
    Drill,
    Screwdriver,
    Ladder,
    MeasuringTape,
    SpiritLevel,
    Wrench,
    Torch,
    Multimeter,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Cutters => "Cutters",
            Category::Pliers => "Pliers",
            Category::Helmet => "Helmet",
            Category::Vest => "Safety Vest",
            Category::Gloves => "Gloves",
            Category::Goggles => "Goggles",
            Category::Shoes => "Safety Shoes",
            Category::Mask => "Mask",
            Category::FaceShield => "Face Shield",
            Category::EarProtection => "Ear Protection",
            Category::Harness => "Harness",
            Category::Vernier => "Vernier Caliper",
            Category::Temperature => "Temperature Gauge",
            Category::Hammer => "Hammer",
            Category::Drill => "Drill",
            Category::Screwdriver => "Screwdriver",
            Category::Ladder => "Ladder",
            Category::MeasuringTape => "Measuring Tape",
            Category::SpiritLevel => "Spirit Level",
            Category::Wrench => "Wrench",
            Category::Torch => "Torch",
            Category::Multimeter => "Multimeter",
        }
    }
}

// Scanned top to bottom; the first category with any substring hit wins.
const KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Helmet, &["helmet", "hard hat", "hardhat", "safety cap"]),
    (Category::Vest, &["vest", "reflective jacket", "hi-vis", "high visibility"]),
    (Category::Gloves, &["glove"]),
    (Category::Goggles, &["goggle", "safety glasses", "spectacles"]),
    (Category::Shoes, &["shoe", "boot", "footwear"]),
    (Category::Mask, &["mask", "respirator"]),
    (Category::FaceShield, &["face shield", "faceshield", "visor"]),
    (Category::EarProtection, &["ear plug", "earplug", "ear muff", "earmuff", "ear protection"]),
    (Category::Harness, &["harness", "safety belt", "lanyard"]),
    (Category::Vernier, &["vernier", "caliper", "calliper"]),
    (Category::Temperature, &["temperature", "thermometer", "thermal gun"]),
    (Category::Hammer, &["hammer", "mallet"]),
    (Category::Drill, &["drill"]),
    (Category::Screwdriver, &["screwdriver", "screw driver"]),
    (Category::Ladder, &["ladder"]),
    (Category::MeasuringTape, &["measuring tape", "measure tape", "tape measure"]),
    (Category::SpiritLevel, &["spirit level", "level gauge"]),
    (Category::Wrench, &["wrench", "spanner"]),
    (Category::Torch, &["torch", "flashlight"]),
    (Category::Multimeter, &["multimeter", "voltage tester"]),
];

/// `cut` as a whole word: no letter directly before it, and followed by a
/// non-alphanumeric character or the end of the text.
fn has_standalone_cut(text: &str) -> bool {
    text.match_indices("cut").any(|(i, _)| {
        let before_ok = text[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = text[i + 3..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

fn is_cutting(text: &str) -> bool {
    // "cutter" also covers "cutters", "wire cutter" and "pipe cutter";
    // "cutting" covers "cutting tool", "cutting plier" and "cutting fitting".
    text.contains("cutter") || text.contains("cutting") || has_standalone_cut(text)
}

/// Maps a free-text tool or PPE description to its category.
///
/// Cutting language is checked before pliers so that "cutting pliers" lands on
/// [`Category::Cutters`]; only then is the keyword table scanned in order.
pub fn classify(text: &str) -> Option<Category> {
    let norm = text.trim().to_lowercase();
    if norm.is_empty() {
        return None;
    }

    if is_cutting(&norm) {
        return Some(Category::Cutters);
    }
    if norm.contains("plier") && !norm.contains("cutting") {
        return Some(Category::Pliers);
    }

    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| norm.contains(w)))
        .map(|(category, _)| *category)
}

/// Same as [`classify`] for values that may be missing altogether.
pub fn classify_opt(text: Option<&str>) -> Option<Category> {
    text.and_then(classify)
}
