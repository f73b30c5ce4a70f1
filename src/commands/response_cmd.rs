//! Response commands

use std::collections::BTreeMap;

use crate::domain::{NpsResponse, NpsSummary};
use crate::AppState;

/// Record a respondent's answer for a campaign
///
/// `answers` maps field ids to the submitted values.
pub async fn submit_response(
    state: &AppState,
    campaign_id: &str,
    score: u8,
    feedback: Option<String>,
    answers: BTreeMap<String, serde_json::Value>,
) -> Result<NpsResponse, String> {
    let mut response = NpsResponse::new(campaign_id, score).map_err(|e| e.to_string())?;
    if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
        response = response.with_feedback(feedback);
    }
    response.form_responses = answers;

    let created = state.responses.create(&response).await.map_err(|e| e.to_string())?;
    log::info!(
        "Recorded response {} for campaign {} (score {})",
        created.id,
        campaign_id,
        created.score
    );
    Ok(created)
}

pub async fn list_responses(state: &AppState, campaign_id: &str) -> Result<Vec<NpsResponse>, String> {
    state
        .responses
        .list_by_campaign(campaign_id)
        .await
        .map_err(|e| e.to_string())
}

/// Promoter/passive/detractor counts and the resulting NPS
pub async fn campaign_summary(state: &AppState, campaign_id: &str) -> Result<NpsSummary, String> {
    let responses = list_responses(state, campaign_id).await?;
    Ok(NpsSummary::from_responses(&responses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{add_field, delete_campaign};
    use crate::domain::Locale;

    #[tokio::test]
    async fn test_submit_and_list() {
        let state = AppState::in_memory(Locale::En);
        let mut answers = BTreeMap::new();
        answers.insert("field-1".to_string(), serde_json::json!("Blue"));

        let created = submit_response(&state, "c1", 9, Some("Nice".to_string()), answers)
            .await
            .unwrap();
        submit_response(&state, "c2", 3, None, BTreeMap::new()).await.unwrap();

        let listed = list_responses(&state, "c1").await.unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(created.feedback.as_deref(), Some("Nice"));
        assert_eq!(created.form_responses["field-1"], serde_json::json!("Blue"));
    }

    #[tokio::test]
    async fn test_blank_feedback_is_dropped() {
        let state = AppState::in_memory(Locale::En);
        let created = submit_response(&state, "c1", 5, Some("  ".to_string()), BTreeMap::new())
            .await
            .unwrap();
        assert!(created.feedback.is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_rejected() {
        let state = AppState::in_memory(Locale::En);
        assert!(submit_response(&state, "c1", 11, None, BTreeMap::new()).await.is_err());
        assert!(list_responses(&state, "c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summary() {
        let state = AppState::in_memory(Locale::En);
        for score in [10, 9, 8, 2] {
            submit_response(&state, "c1", score, None, BTreeMap::new()).await.unwrap();
        }

        let summary = campaign_summary(&state, "c1").await.unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.promoters, 2);
        assert_eq!(summary.passives, 1);
        assert_eq!(summary.detractors, 1);
        assert_eq!(summary.score, 25);
    }

    #[tokio::test]
    async fn test_delete_campaign_drops_responses() {
        let state = AppState::in_memory(Locale::En);
        add_field(&state, "c1", "text").await.unwrap();
        submit_response(&state, "c1", 7, None, BTreeMap::new()).await.unwrap();
        let kept = submit_response(&state, "c2", 7, None, BTreeMap::new()).await.unwrap();

        delete_campaign(&state, "c1").await.unwrap();

        assert!(list_responses(&state, "c1").await.unwrap().is_empty());
        assert_eq!(list_responses(&state, "c2").await.unwrap(), vec![kept]);
    }
}
