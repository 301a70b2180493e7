//! Approval status of a stage.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Verdict;

/// Where a stage stands with its reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    /// The stage has not been reviewed yet.
    #[default]
    Pending,
    /// The latest review approved the artifact.
    Approved,
    /// The latest review asked for a revision.
    Rejected,
}

impl Approval {
    /// Derives the approval status from the latest verdict, if any.
    #[must_use]
    pub fn from_verdict(verdict: Option<Verdict>) -> Self {
        match verdict {
            None => Self::Pending,
            Some(v) if v.is_approval() => Self::Approved,
            Some(_) => Self::Rejected,
        }
    }

    /// Returns true once a review has happened.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_from_verdict() {
        assert_eq!(Approval::from_verdict(None), Approval::Pending);
        assert_eq!(Approval::from_verdict(Some(Verdict::Approved)), Approval::Approved);
        assert_eq!(Approval::from_verdict(Some(Verdict::Passed)), Approval::Approved);
        assert_eq!(Approval::from_verdict(Some(Verdict::FeedBack)), Approval::Rejected);
        assert_eq!(Approval::from_verdict(Some(Verdict::Failed)), Approval::Rejected);
    }

    #[test]
    fn test_approval_display() {
        assert_eq!(Approval::Pending.to_string(), "pending");
        assert_eq!(Approval::Rejected.to_string(), "rejected");
        assert!(!Approval::default().is_decided());
    }

    #[test]
    fn test_approval_serialize() {
        let json = serde_json::to_string(&Approval::Approved).unwrap();
        assert_eq!(json, r#""approved""#);
    }
}
