//! Descriptive step metadata (instructions, tips, hints).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Guidance attached to a step. Not needed for progress correctness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepMetadata {
    /// Main instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Tips by category
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tips: BTreeMap<String, String>,

    /// Progressive hints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,

    /// Mistakes to avoid
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_mistakes: Vec<String>,

    /// Any other keys found in the file
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StepMetadata {
    /// Create metadata with instructions.
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: Some(instructions.into()),
            ..Default::default()
        }
    }

    /// Add a tip.
    pub fn with_tip(mut self, category: impl Into<String>, tip: impl Into<String>) -> Self {
        self.tips.insert(category.into(), tip.into());
        self
    }

    /// Add a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Add a common mistake.
    pub fn with_common_mistake(mut self, mistake: impl Into<String>) -> Self {
        self.common_mistakes.push(mistake.into());
        self
    }

    /// Whether there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_none()
            && self.tips.is_empty()
            && self.hints.is_empty()
            && self.common_mistakes.is_empty()
            && self.extra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_keys_are_kept() {
        let json = r#"{"instructions": "Load the CSV", "hints": ["use read_csv"], "difficulty": "easy"}"#;
        let meta: StepMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.instructions.as_deref(), Some("Load the CSV"));
        assert_eq!(meta.hints.len(), 1);
        assert_eq!(meta.extra["difficulty"], "easy");

        let out = serde_json::to_value(&meta).unwrap();
        assert_eq!(out["difficulty"], "easy");
        assert!(out.get("tips").is_none());
    }

    #[test]
    fn test_builder() {
        let meta = StepMetadata::new("Connect")
            .with_tip("network", "check the firewall")
            .with_hint("ping first")
            .with_common_mistake("wrong port");
        assert!(!meta.is_empty());
        assert!(StepMetadata::default().is_empty());
    }
}
