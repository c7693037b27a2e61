//! Stage identity and status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the eight fixed painting stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageKind {
    /// Light pencil sketch.
    #[serde(rename = "sketch")]
    Sketch,
    /// First light wash.
    #[serde(rename = "wash-1")]
    Wash1,
    /// Second wash, building color.
    #[serde(rename = "wash-2")]
    Wash2,
    /// Medium tone values.
    #[serde(rename = "medium-tone")]
    MediumTone,
    /// Shadow development.
    #[serde(rename = "shadow")]
    Shadow,
    /// Details and texture.
    #[serde(rename = "detail")]
    Detail,
    /// Deepest darks.
    #[serde(rename = "darkest-value")]
    DarkestValue,
    /// Finished painting.
    #[serde(rename = "finish")]
    Finish,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [Self; 8] = [
        Self::Sketch,
        Self::Wash1,
        Self::Wash2,
        Self::MediumTone,
        Self::Shadow,
        Self::Detail,
        Self::DarkestValue,
        Self::Finish,
    ];

    /// Number of stages in a run.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the one-based position of the stage.
    #[must_use]
    pub const fn position(self) -> u8 {
        match self {
            Self::Sketch => 1,
            Self::Wash1 => 2,
            Self::Wash2 => 3,
            Self::MediumTone => 4,
            Self::Shadow => 5,
            Self::Detail => 6,
            Self::DarkestValue => 7,
            Self::Finish => 8,
        }
    }

    /// Returns the stage at a one-based position.
    #[must_use]
    pub fn from_position(position: u8) -> Option<Self> {
        Self::ALL.get(usize::from(position).checked_sub(1)?).copied()
    }

    /// Returns the stage that runs before this one.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        Self::from_position(self.position() - 1)
    }

    /// Returns the stage that runs after this one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::from_position(self.position() + 1)
    }

    /// Returns the short identifier used in logs and serialized reports.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Sketch => "sketch",
            Self::Wash1 => "wash-1",
            Self::Wash2 => "wash-2",
            Self::MediumTone => "medium-tone",
            Self::Shadow => "shadow",
            Self::Detail => "detail",
            Self::DarkestValue => "darkest-value",
            Self::Finish => "finish",
        }
    }

    /// Returns the canonical artifact name, without extension.
    ///
    /// Downstream consumers rely on these names to find stage outputs.
    #[must_use]
    pub const fn canonical_stem(self) -> &'static str {
        match self {
            Self::Sketch => "step1_light_sketch",
            Self::Wash1 => "step2_first_wash",
            Self::Wash2 => "step3_second_wash",
            Self::MediumTone => "step4_medium_tones",
            Self::Shadow => "step5_shadows",
            Self::Detail => "step6_details",
            Self::DarkestValue => "step7_darkest_values",
            Self::Finish => "step8_finished_watercolor",
        }
    }

    /// Returns the default display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Sketch => "Step 1: Light Pencil Sketch",
            Self::Wash1 => "Step 2: First Light Wash",
            Self::Wash2 => "Step 3: Second Wash - Building Color",
            Self::MediumTone => "Step 4: Medium Tones",
            Self::Shadow => "Step 5: Developing Shadows",
            Self::Detail => "Step 6: Adding Details and Texture",
            Self::DarkestValue => "Step 7: Deepest Darks",
            Self::Finish => "Step 8: Finished Watercolor Painting",
        }
    }

    /// Returns true for the last stage of the pipeline.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Finish)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Outcome discriminant of a stage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage produced and persisted an image.
    Produced,
    /// The stage failed; the run stopped here.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Produced => write!(f, "produced"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Produced)
    }
}
