//! Field List
//!
//! The ordered, uniquely-keyed field collection behind the editor. Every
//! operation leaves `order` dense and equal to list position.
//!
//! Operations return `Ok(true)` when the list changed, `Ok(false)` for no-ops
//! (unknown id, out-of-range index) and `Err(EditRejected)` when the change
//! would break a protected minimum. Rejected operations change nothing.

use crate::domain::ordering;
use crate::domain::{default_options, Field, FieldLabels, FieldPatch, FieldType};

/// Why a mutation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditRejected {
    /// A form always keeps at least one question
    LastField,
    /// NPS questions cannot be removed or retyped
    ProtectedNps,
    /// A choice field always keeps at least one option
    LastOption,
    /// A choice field cannot be given an empty option list
    EmptyOptions,
    /// Options were supplied for a field that does not take them
    OptionsNotAllowed,
}

impl std::fmt::Display for EditRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            EditRejected::LastField => "cannot remove the last field",
            EditRejected::ProtectedNps => "NPS questions cannot be removed or retyped",
            EditRejected::LastOption => "at least one option must remain",
            EditRejected::EmptyOptions => "options cannot be empty",
            EditRejected::OptionsNotAllowed => "only select and radio fields have options",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for EditRejected {}

pub type EditResult = Result<bool, EditRejected>;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldList {
    fields: Vec<Field>,
}

impl FieldList {
    /// Normalize stored fields, or seed the default NPS question when there are none.
    ///
    /// An empty stored list is treated like a missing one.
    pub fn initialize(existing: Option<Vec<Field>>, labels: &dyn FieldLabels) -> Self {
        match existing {
            Some(mut fields) if !fields.is_empty() => {
                ordering::normalize(&mut fields);
                Self { fields }
            }
            _ => Self {
                fields: vec![Field::default_nps(labels)],
            },
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    /// Append a field of `kind` with default text; returns its id
    pub fn add(&mut self, kind: FieldType, labels: &dyn FieldLabels) -> String {
        let field = Field::new(kind, self.fields.len() as u32, labels);
        let id = field.id.clone();
        self.fields.push(field);
        id
    }

    pub fn remove(&mut self, id: &str) -> EditResult {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        if self.fields.len() == 1 {
            return Err(EditRejected::LastField);
        }
        if self.fields[index].is_nps() {
            return Err(EditRejected::ProtectedNps);
        }

        self.fields.remove(index);
        ordering::resequence(&mut self.fields);
        Ok(true)
    }

    /// Merge `patch` into the field with `id`
    pub fn update(&mut self, id: &str, patch: FieldPatch, labels: &dyn FieldLabels) -> EditResult {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        if patch.is_empty() {
            return Ok(false);
        }

        let current = &self.fields[index];
        let kind = patch.kind.unwrap_or(current.kind);
        if kind != FieldType::Nps && current.is_nps() {
            return Err(EditRejected::ProtectedNps);
        }

        let options = match patch.options {
            Some(_) if !kind.is_choice() => return Err(EditRejected::OptionsNotAllowed),
            Some(options) if options.is_empty() => return Err(EditRejected::EmptyOptions),
            Some(options) => Some(options),
            None if kind.is_choice() => current
                .options
                .clone()
                .filter(|options| !options.is_empty())
                .or_else(|| Some(default_options(labels))),
            None => None,
        };

        let field = &mut self.fields[index];
        field.kind = kind;
        field.options = options;
        if let Some(label) = patch.label {
            field.label = label;
        }
        if let Some(required) = patch.required {
            field.required = required;
        }
        Ok(true)
    }

    /// Append a default-labelled option to a choice field
    pub fn add_option(&mut self, field_id: &str, labels: &dyn FieldLabels) -> EditResult {
        let Some(options) = self.options_mut(field_id) else {
            return Ok(false);
        };
        let label = labels.option_label(options.len() + 1);
        options.push(label);
        Ok(true)
    }

    pub fn update_option(&mut self, field_id: &str, index: usize, value: impl Into<String>) -> EditResult {
        let Some(option) = self.options_mut(field_id).and_then(|options| options.get_mut(index)) else {
            return Ok(false);
        };
        let value = value.into();
        if *option == value {
            return Ok(false);
        }
        *option = value;
        Ok(true)
    }

    pub fn remove_option(&mut self, field_id: &str, index: usize) -> EditResult {
        let Some(options) = self.options_mut(field_id) else {
            return Ok(false);
        };
        if index >= options.len() {
            return Ok(false);
        }
        if options.len() == 1 {
            return Err(EditRejected::LastOption);
        }
        options.remove(index);
        Ok(true)
    }

    /// Move the field at `from` to `to` (past the end means last)
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        ordering::move_field(&mut self.fields, from, to)
    }

    fn options_mut(&mut self, field_id: &str) -> Option<&mut Vec<String>> {
        self.fields
            .iter_mut()
            .find(|f| f.id == field_id)
            .and_then(|f| f.options.as_mut())
    }
}
