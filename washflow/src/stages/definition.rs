//! Stage definitions and the validated eight-stage set.

use crate::core::{OutputFormat, StageKind};
use crate::errors::InputError;
use crate::stages::prompts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static configuration for one stage.
///
/// The prompt text is arbitrary caller-supplied text and is sent to the
/// generator as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Which of the eight stages this is.
    pub kind: StageKind,
    /// Human-readable name.
    pub name: String,
    /// Instruction text for the stage.
    pub prompt_template: String,
    /// Artifact file name without extension.
    pub output_stem: String,
}

impl StageDefinition {
    /// Creates a definition with the stage's default name and artifact stem.
    #[must_use]
    pub fn new(kind: StageKind, prompt_template: impl Into<String>) -> Self {
        Self {
            kind,
            name: kind.display_name().to_string(),
            prompt_template: prompt_template.into(),
            output_stem: kind.canonical_stem().to_string(),
        }
    }

    /// Creates the default watercolor definition for a stage.
    #[must_use]
    pub fn watercolor(kind: StageKind) -> Self {
        Self::new(kind, prompts::default_prompt(kind))
    }

    /// Sets the instruction text.
    #[must_use]
    pub fn with_prompt(mut self, prompt_template: impl Into<String>) -> Self {
        self.prompt_template = prompt_template.into();
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the artifact stem.
    #[must_use]
    pub fn with_output_stem(mut self, output_stem: impl Into<String>) -> Self {
        self.output_stem = output_stem.into();
        self
    }

    /// Returns the one-based position of the stage.
    #[must_use]
    pub fn position(&self) -> u8 {
        self.kind.position()
    }

    /// Returns the artifact file name for the given format.
    #[must_use]
    pub fn output_filename(&self, format: OutputFormat) -> String {
        format!("{}.{}", self.output_stem, format.extension())
    }
}

/// Exactly eight stage definitions in pipeline order.
///
/// A `StageSet` can only be built through validation, so holding one means
/// the order, count and artifact names are already known to be sound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StageDefinition>", into = "Vec<StageDefinition>")]
pub struct StageSet {
    definitions: Vec<StageDefinition>,
}

impl StageSet {
    /// Validates a list of stage definitions.
    pub fn new(definitions: Vec<StageDefinition>) -> Result<Self, InputError> {
        if definitions.len() != StageKind::COUNT {
            return Err(InputError::StageCount {
                expected: StageKind::COUNT,
                actual: definitions.len(),
            });
        }

        let mut seen: HashMap<String, StageKind> = HashMap::new();
        for (index, (definition, expected)) in
            definitions.iter().zip(StageKind::ALL).enumerate()
        {
            if definition.kind != expected {
                return Err(InputError::StageOrder {
                    position: index + 1,
                    expected,
                    actual: definition.kind,
                });
            }

            if !is_valid_stem(&definition.output_stem) {
                return Err(InputError::InvalidFilename {
                    stage: definition.kind,
                    filename: definition.output_stem.clone(),
                });
            }

            let folded = definition.output_stem.to_ascii_lowercase();
            if let Some(first) = seen.insert(folded, definition.kind) {
                return Err(InputError::DuplicateFilename {
                    first,
                    second: definition.kind,
                    filename: definition.output_stem.clone(),
                });
            }
        }

        Ok(Self { definitions })
    }

    /// Returns the default watercolor stage set.
    #[must_use]
    pub fn watercolor() -> Self {
        Self {
            definitions: StageKind::ALL
                .into_iter()
                .map(StageDefinition::watercolor)
                .collect(),
        }
    }

    /// Replaces the instruction text of one stage.
    #[must_use]
    pub fn with_prompt(mut self, kind: StageKind, prompt_template: impl Into<String>) -> Self {
        self.definitions[kind_index(kind)].prompt_template = prompt_template.into();
        self
    }

    /// Returns the definition for a stage.
    #[must_use]
    pub fn get(&self, kind: StageKind) -> &StageDefinition {
        &self.definitions[kind_index(kind)]
    }

    /// Iterates over the definitions in pipeline order.
    pub fn iter(&self) -> std::slice::Iter<'_, StageDefinition> {
        self.definitions.iter()
    }

    /// Returns the number of definitions (always eight).
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Always false; a valid set is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the definitions.
    #[must_use]
    pub fn into_vec(self) -> Vec<StageDefinition> {
        self.definitions
    }
}

impl Default for StageSet {
    fn default() -> Self {
        Self::watercolor()
    }
}

impl TryFrom<Vec<StageDefinition>> for StageSet {
    type Error = InputError;

    fn try_from(definitions: Vec<StageDefinition>) -> Result<Self, Self::Error> {
        Self::new(definitions)
    }
}

impl From<StageSet> for Vec<StageDefinition> {
    fn from(set: StageSet) -> Self {
        set.definitions
    }
}

impl<'a> IntoIterator for &'a StageSet {
    type Item = &'a StageDefinition;
    type IntoIter = std::slice::Iter<'a, StageDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}

fn kind_index(kind: StageKind) -> usize {
    usize::from(kind.position()) - 1
}

/// A stem must name a plain file directly inside the output root.
fn is_valid_stem(stem: &str) -> bool {
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
