use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurposeKind {
    Normal,
    Exams,
}

/// Study plan lengths offered by the purpose dialog, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ExamDuration {
    Days30,
    Days60,
    Days90,
    Days120,
}

impl ExamDuration {
    pub const ALL: [ExamDuration; 4] = [Self::Days30, Self::Days60, Self::Days90, Self::Days120];

    pub fn days(self) -> u32 {
        match self {
            Self::Days30 => 30,
            Self::Days60 => 60,
            Self::Days90 => 90,
            Self::Days120 => 120,
        }
    }
}

impl Default for ExamDuration {
    fn default() -> Self {
        Self::Days30
    }
}

impl TryFrom<u32> for ExamDuration {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|d| d.days() == days)
            .ok_or_else(|| format!("unsupported exam duration: {} days", days))
    }
}

impl From<ExamDuration> for u32 {
    fn from(d: ExamDuration) -> u32 {
        d.days()
    }
}

/// What the user (or a group) is working towards. Steers AI suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purpose {
    #[serde(rename = "type")]
    pub kind: PurposeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_duration: Option<ExamDuration>,
}

impl Purpose {
    pub fn normal() -> Self {
        Self {
            kind: PurposeKind::Normal,
            exam_name: None,
            exam_duration: None,
        }
    }

    /// Build an exam purpose; the exam name is required.
    pub fn exams(exam_name: &str, duration: ExamDuration) -> Result<Self, ValidationError> {
        let name = exam_name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingExamName);
        }
        Ok(Self {
            kind: PurposeKind::Exams,
            exam_name: Some(name.to_string()),
            exam_duration: Some(duration),
        })
    }

    pub fn is_exam(&self) -> bool {
        self.kind == PurposeKind::Exams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_purpose_requires_name() {
        assert_eq!(
            Purpose::exams("  ", ExamDuration::Days60).unwrap_err(),
            ValidationError::MissingExamName
        );
        let p = Purpose::exams("SAT", ExamDuration::Days60).unwrap();
        assert!(p.is_exam());
        assert_eq!(p.exam_duration.map(ExamDuration::days), Some(60));
    }

    #[test]
    fn serializes_like_stored_documents() {
        let p = Purpose::exams("PMP", ExamDuration::Days90).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "exams");
        assert_eq!(json["examName"], "PMP");
        assert_eq!(json["examDuration"], 90);

        let normal = serde_json::to_value(Purpose::normal()).unwrap();
        assert_eq!(normal, serde_json::json!({ "type": "normal" }));
    }

    #[test]
    fn rejects_unknown_duration() {
        let parsed: Result<Purpose, _> =
            serde_json::from_str(r#"{"type":"exams","examName":"X","examDuration":45}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn every_offered_duration_parses_from_its_days() {
        for duration in ExamDuration::ALL {
            assert_eq!(ExamDuration::try_from(duration.days()), Ok(duration));
        }
        assert!(ExamDuration::try_from(0).is_err());
    }
}
