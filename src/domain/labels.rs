//! Default Field Texts
//!
//! New fields and options get locale-specific placeholder text.

use serde::{Deserialize, Serialize};
use super::field::FieldType;

/// Supplies the placeholder text for new fields and options
pub trait FieldLabels: Send + Sync {
    /// Prompt used for a freshly added field of `kind`
    fn default_label(&self, kind: FieldType) -> String;

    /// Text of the option at 1-based `position`
    fn option_label(&self, position: usize) -> String;
}

/// Built-in locales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Pt,
}

impl FieldLabels for Locale {
    fn default_label(&self, kind: FieldType) -> String {
        let text = match (self, kind) {
            (Locale::En, FieldType::Nps) => {
                "How likely are you to recommend our service to a friend or colleague?"
            }
            (Locale::En, FieldType::Text) => "Please share your feedback",
            (Locale::En, FieldType::Select) => "Select an option",
            (Locale::En, FieldType::Radio) => "Choose an option",
            (Locale::Pt, FieldType::Nps) => {
                "O quanto você recomendaria nosso serviço para um amigo ou colega?"
            }
            (Locale::Pt, FieldType::Text) => "Por favor, compartilhe seu feedback",
            (Locale::Pt, FieldType::Select) => "Selecione uma opção",
            (Locale::Pt, FieldType::Radio) => "Escolha uma opção",
        };
        text.to_string()
    }

    fn option_label(&self, position: usize) -> String {
        match self {
            Locale::En => format!("Option {}", position),
            Locale::Pt => format!("Opção {}", position),
        }
    }
}

/// The two options every new choice field starts with
pub fn default_options(labels: &dyn FieldLabels) -> Vec<String> {
    vec![labels.option_label(1), labels.option_label(2)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_defaults() {
        assert_eq!(Locale::En.default_label(FieldType::Text), "Please share your feedback");
        assert_eq!(default_options(&Locale::En), vec!["Option 1", "Option 2"]);
    }

    #[test]
    fn test_portuguese_options() {
        assert_eq!(Locale::Pt.option_label(3), "Opção 3");
    }
}
