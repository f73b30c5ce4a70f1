//! NPS Response Entity
//!
//! A respondent's answers to a campaign form, plus the aggregate score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use super::entity::{new_id, DomainError, DomainResult, Entity};

pub const MAX_SCORE: u8 = 10;

/// One submitted survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpsResponse {
    pub id: String,
    pub campaign_id: String,
    /// 0-10 recommendation score
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Answers to the remaining questions, keyed by field id
    #[serde(default)]
    pub form_responses: BTreeMap<String, serde_json::Value>,
    /// RFC 3339 timestamp
    pub created_at: String,
}

impl NpsResponse {
    pub fn new(campaign_id: impl Into<String>, score: u8) -> DomainResult<Self> {
        validate_score(score)?;
        Ok(Self {
            id: new_id(),
            campaign_id: campaign_id.into(),
            score,
            feedback: None,
            form_responses: BTreeMap::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn with_answer(mut self, field_id: impl Into<String>, value: serde_json::Value) -> Self {
        self.form_responses.insert(field_id.into(), value);
        self
    }

    pub fn category(&self) -> ScoreCategory {
        ScoreCategory::of(self.score)
    }
}

impl Entity for NpsResponse {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

pub fn validate_score(score: u8) -> DomainResult<()> {
    if score > MAX_SCORE {
        return Err(DomainError::InvalidInput(format!(
            "NPS score must be between 0 and {}, got {}",
            MAX_SCORE, score
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    /// 9-10
    Promoter,
    /// 7-8
    Passive,
    /// 0-6
    Detractor,
}

impl ScoreCategory {
    pub fn of(score: u8) -> Self {
        match score {
            9.. => ScoreCategory::Promoter,
            7 | 8 => ScoreCategory::Passive,
            _ => ScoreCategory::Detractor,
        }
    }
}

/// Aggregate over a set of responses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpsSummary {
    pub total: usize,
    pub promoters: usize,
    pub passives: usize,
    pub detractors: usize,
    /// -100..=100, 0 when there are no responses
    pub score: i32,
}

impl NpsSummary {
    pub fn from_responses<'a>(responses: impl IntoIterator<Item = &'a NpsResponse>) -> Self {
        let mut summary = Self::default();
        for response in responses {
            summary.total += 1;
            match response.category() {
                ScoreCategory::Promoter => summary.promoters += 1,
                ScoreCategory::Passive => summary.passives += 1,
                ScoreCategory::Detractor => summary.detractors += 1,
            }
        }

        if summary.total > 0 {
            let net = summary.promoters as f64 - summary.detractors as f64;
            summary.score = (100.0 * net / summary.total as f64).round() as i32;
        }
        summary
    }
}
