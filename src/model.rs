/// Decoded image payload as handed over by the record source. The bytes are
/// opaque to layout; only the output backends look inside them.
pub type ImageData = Vec<u8>;

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default, rename_all = "camelCase"))]
pub struct SopHeader {
    pub organization: String,
    pub division: String,
    pub activity: String,
    pub sub_activity: String,
    pub element: String,
    pub sop_number: String,
    pub date: String,
    pub standard_time: String, // minutes
    pub team_size: String,
    pub technician_grade: String,
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default, rename_all = "camelCase"))]
pub struct Step {
    pub step_no: String,
    pub description: String,
    pub tools: String,
    pub time_min: String,
    pub symbol: String,
    pub quality_char: String,
    pub spec: String,
    pub reaction: String,
}

#[derive(Clone, Debug, Default)]
pub struct ProcessImage {
    pub caption: String,
    pub image_data: ImageData,
}

/// A do, don't or quality-inspection entry.
#[derive(Clone, Debug, Default)]
pub struct GuidanceItem {
    pub text: String,
    pub image_data: Option<ImageData>,
}

#[derive(Clone, Debug, Default)]
pub struct SafetyItem {
    pub sl_no: Option<String>,
    pub requirement: String,
    pub remarks: String,
    pub image_data: Option<ImageData>,
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default, rename_all = "camelCase"))]
pub struct Revision {
    pub sl_no: String,
    pub rev_no: String,
    pub details: String,
    pub reason: String,
    pub date: String,
    pub remark: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignerRole {
    PreparedBy,
    ReviewedBy,
    ApprovedBy,
}

impl SignerRole {
    /// Fixed display and signature-box priority order.
    pub const ORDER: [SignerRole; 3] = [
        SignerRole::PreparedBy,
        SignerRole::ReviewedBy,
        SignerRole::ApprovedBy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SignerRole::PreparedBy => "Prepared By",
            SignerRole::ReviewedBy => "Reviewed By",
            SignerRole::ApprovedBy => "Approved By",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let norm: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match norm.as_str() {
            "preparedby" | "prepared" => Some(SignerRole::PreparedBy),
            "reviewedby" | "reviewed" => Some(SignerRole::ReviewedBy),
            "approvedby" | "approved" => Some(SignerRole::ApprovedBy),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Remark {
    pub role: SignerRole,
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct SopRecord {
    pub header: SopHeader,
    pub steps: Vec<Step>,
    pub images: Vec<ProcessImage>,
    pub dos: Vec<GuidanceItem>,
    pub donts: Vec<GuidanceItem>,
    pub quality_inspection: Vec<GuidanceItem>,
    pub safety_items: Vec<SafetyItem>,
    pub revision_history: Vec<Revision>,
    pub remarks: Vec<Remark>,
}

/// Signers sharing one role, in first-seen order.
#[derive(Clone, Debug, PartialEq)]
pub struct SignerGroup<'a> {
    pub role: SignerRole,
    pub names: Vec<&'a str>,
}

impl SignerGroup<'_> {
    pub fn display_name(&self) -> String {
        self.names.join(" / ")
    }
}

impl SopRecord {
    /// Groups `remarks` by role in the fixed Prepared, Reviewed, Approved
    /// order. Roles without a (non-blank) signer are omitted.
    pub fn signer_groups(&self) -> Vec<SignerGroup<'_>> {
        SignerRole::ORDER
            .iter()
            .filter_map(|&role| {
                let names: Vec<&str> = self
                    .remarks
                    .iter()
                    .filter(|r| r.role == role)
                    .map(|r| r.name.trim())
                    .filter(|n| !n.is_empty())
                    .collect();
                (!names.is_empty()).then_some(SignerGroup { role, names })
            })
            .collect()
    }

    /// Joined display name for one role, empty when nobody signed it.
    pub fn signer_display(&self, role: SignerRole) -> String {
        self.signer_groups()
            .into_iter()
            .find(|g| g.role == role)
            .map(|g| g.display_name())
            .unwrap_or_default()
    }
}
