//! Form editing commands
//!
//! Each command runs one short editor session: open the campaign's form,
//! apply a single mutation, wait for the write-through save and return the
//! resulting form.

use crate::domain::{FieldPatch, FieldType, Form};
use crate::editor::FieldListEditor;
use crate::AppState;

async fn edit_form<F>(state: &AppState, campaign_id: &str, apply: F) -> Result<Form, String>
where
    F: FnOnce(&mut FieldListEditor) -> Result<(), String>,
{
    let mut editor = FieldListEditor::open(campaign_id, state.forms.clone(), state.labels.clone())
        .await
        .map_err(|e| e.to_string())?;

    let applied = apply(&mut editor);
    editor.flush().await;
    let failed = editor.failed_saves();
    let form = editor.snapshot();
    editor.close().await;

    applied?;
    if failed > 0 {
        return Err(format!("Failed to save form for campaign {}", campaign_id));
    }
    Ok(form)
}

fn parse_kind(kind: &str) -> Result<FieldType, String> {
    FieldType::parse(kind).ok_or_else(|| format!("Unknown field type: {}", kind))
}

/// Current form, or the default single-question form if none is stored
pub async fn show_form(state: &AppState, campaign_id: &str) -> Result<Form, String> {
    edit_form(state, campaign_id, |_| Ok(())).await
}

/// Append a field of the given type
pub async fn add_field(state: &AppState, campaign_id: &str, kind: &str) -> Result<Form, String> {
    let kind = parse_kind(kind)?;
    edit_form(state, campaign_id, |editor| {
        editor.add_field(kind);
        Ok(())
    })
    .await
}

pub async fn remove_field(state: &AppState, campaign_id: &str, field_id: &str) -> Result<Form, String> {
    edit_form(state, campaign_id, |editor| {
        editor.remove_field(field_id).map(|_| ()).map_err(|e| e.to_string())
    })
    .await
}

/// Apply a partial update; `kind` is given by name
pub async fn update_field(
    state: &AppState,
    campaign_id: &str,
    field_id: &str,
    kind: Option<&str>,
    label: Option<String>,
    required: Option<bool>,
    options: Option<Vec<String>>,
) -> Result<Form, String> {
    let patch = FieldPatch {
        kind: kind.map(parse_kind).transpose()?,
        label,
        required,
        options,
    };
    if patch.is_empty() {
        return Err("Nothing to update".to_string());
    }

    edit_form(state, campaign_id, |editor| {
        editor.update_field(field_id, patch).map(|_| ()).map_err(|e| e.to_string())
    })
    .await
}

pub async fn add_option(state: &AppState, campaign_id: &str, field_id: &str) -> Result<Form, String> {
    edit_form(state, campaign_id, |editor| {
        editor.add_option(field_id).map(|_| ()).map_err(|e| e.to_string())
    })
    .await
}

pub async fn set_option(
    state: &AppState,
    campaign_id: &str,
    field_id: &str,
    index: usize,
    value: String,
) -> Result<Form, String> {
    edit_form(state, campaign_id, |editor| {
        editor.update_option(field_id, index, value).map(|_| ()).map_err(|e| e.to_string())
    })
    .await
}

pub async fn remove_option(
    state: &AppState,
    campaign_id: &str,
    field_id: &str,
    index: usize,
) -> Result<Form, String> {
    edit_form(state, campaign_id, |editor| {
        editor.remove_option(field_id, index).map(|_| ()).map_err(|e| e.to_string())
    })
    .await
}

/// Move the field at `from` to `to` (positions in display order)
pub async fn move_field(state: &AppState, campaign_id: &str, from: usize, to: usize) -> Result<Form, String> {
    edit_form(state, campaign_id, |editor| {
        editor.reorder(from, to);
        Ok(())
    })
    .await
}

/// Final save of the campaign's form
pub async fn commit_form(state: &AppState, campaign_id: &str) -> Result<Form, String> {
    let mut committed = None;
    edit_form(state, campaign_id, |editor| {
        committed = Some(editor.commit());
        Ok(())
    })
    .await?;
    committed.ok_or_else(|| "Nothing committed".to_string())
}

/// Remove the campaign's form and all of its responses
pub async fn delete_campaign(state: &AppState, campaign_id: &str) -> Result<(), String> {
    state.forms.delete_campaign(campaign_id).await.map_err(|e| e.to_string())?;
    log::info!("Deleted campaign {}", campaign_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Locale;

    #[tokio::test]
    async fn test_show_does_not_persist_default_form() {
        let state = AppState::in_memory(Locale::En);
        let form = show_form(&state, "c1").await.unwrap();

        assert_eq!(form.fields.len(), 1);
        assert!(form.fields[0].is_nps());
        assert!(state.forms.load("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_edits_accumulate_across_sessions() {
        let state = AppState::in_memory(Locale::En);

        add_field(&state, "c1", "radio").await.unwrap();
        let form = add_field(&state, "c1", "text").await.unwrap();
        assert_eq!(form.fields.len(), 3);

        let radio_id = form.fields[1].id.clone();
        add_option(&state, "c1", &radio_id).await.unwrap();
        set_option(&state, "c1", &radio_id, 2, "Maybe".to_string()).await.unwrap();
        let form = move_field(&state, "c1", 2, 0).await.unwrap();

        let stored = state.forms.load("c1").await.unwrap().unwrap();
        assert_eq!(stored, form);
        assert_eq!(stored.fields[0].kind, FieldType::Text);
        assert_eq!(
            stored.fields[2].options.as_deref(),
            Some(&["Option 1".to_string(), "Option 2".to_string(), "Maybe".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_form_id_is_stable_once_stored() {
        let state = AppState::in_memory(Locale::En);
        let first = add_field(&state, "c1", "text").await.unwrap();
        let second = add_field(&state, "c1", "text").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_rejections_are_reported() {
        let state = AppState::in_memory(Locale::En);
        let form = show_form(&state, "c1").await.unwrap();
        let nps_id = form.fields[0].id.clone();

        assert!(remove_field(&state, "c1", &nps_id).await.is_err());
        assert!(add_field(&state, "c1", "checkbox").await.is_err());
        assert!(update_field(&state, "c1", &nps_id, None, None, None, None).await.is_err());
        assert!(state.forms.load("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_field_changes_type() {
        let state = AppState::in_memory(Locale::Pt);
        let form = add_field(&state, "c1", "text").await.unwrap();
        let text_id = form.fields[1].id.clone();

        let form = update_field(&state, "c1", &text_id, Some("select"), Some("Cor".to_string()), Some(true), None)
            .await
            .unwrap();

        let field = &form.fields[1];
        assert_eq!(field.kind, FieldType::Select);
        assert_eq!(field.label, "Cor");
        assert!(field.required);
        assert_eq!(field.options.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_commit_stores_form() {
        let state = AppState::in_memory(Locale::En);
        let committed = commit_form(&state, "c1").await.unwrap();
        assert_eq!(state.forms.load("c1").await.unwrap(), Some(committed));
    }

    #[tokio::test]
    async fn test_delete_campaign_removes_form() {
        let state = AppState::in_memory(Locale::En);
        add_field(&state, "c1", "text").await.unwrap();

        delete_campaign(&state, "c1").await.unwrap();
        assert!(state.forms.load("c1").await.unwrap().is_none());
    }
}
