use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::client::Endpoint;

/// Stage of the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Normalizing the regulatory submission
    Submission,
    /// Normalizing the checklist
    Checklist,
    /// Reviewing the submission against the checklist
    Review,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Submission, Stage::Checklist, Stage::Review];

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Stage::Submission => Endpoint::TransformSubmission,
            Stage::Checklist => Endpoint::TransformChecklist,
            Stage::Review => Endpoint::RunReview,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Submission => "submission",
            Stage::Checklist => "checklist",
            Stage::Review => "review",
        }
    }

    /// Whether the stage takes pasted text or an uploaded file.
    pub fn is_transform(&self) -> bool {
        !matches!(self, Stage::Review)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown stage '{0}' (expected submission, checklist or review)")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submission" | "sub" => Ok(Stage::Submission),
            "checklist" | "check" => Ok(Stage::Checklist),
            "review" => Ok(Stage::Review),
            _ => Err(UnknownStage(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(Stage::Submission.endpoint().path(), "/transform_submission");
        assert_eq!(Stage::Checklist.endpoint().path(), "/transform_checklist");
        assert_eq!(Stage::Review.endpoint().path(), "/run_review");
    }

    #[test]
    fn test_parse() {
        assert_eq!("Submission".parse::<Stage>().unwrap(), Stage::Submission);
        assert_eq!("check".parse::<Stage>().unwrap(), Stage::Checklist);
        assert!("summary".parse::<Stage>().is_err());
    }

    #[test]
    fn test_transform_stages() {
        assert!(Stage::Submission.is_transform());
        assert!(!Stage::Review.is_transform());
    }
}
