use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;

/// Architecture family of a pretrained encoder
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Family {
    /// Original BERT checkpoints
    Bert,

    /// RoBERTa checkpoints, which load with the same encoder
    Roberta,
}

impl Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Family::Bert => "bert",
            Family::Roberta => "roberta",
        };

        write!(f, "{}", name)
    }
}

/// A pretrained encoder known to work as a frozen spam-classifier backbone
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Model {
    name: &'static str,
    family: Family,
}

impl Model {
    const fn new(name: &'static str, family: Family) -> Self {
        Self { name, family }
    }

    /// The Hugging Face Hub id
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The architecture family
    pub fn family(&self) -> Family {
        self.family
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// All available models, in the order they are listed to users
pub static MODELS: &[Model; 6] = &[
    Model::new("roberta-base", Family::Roberta),
    Model::new("roberta-large", Family::Roberta),
    Model::new("bert-base-uncased", Family::Bert),
    Model::new("bert-base-cased", Family::Bert),
    Model::new("bert-large-uncased", Family::Bert),
    Model::new("bert-large-cased", Family::Bert),
];

/// The default model to use
pub static DEFAULT_MODEL: &str = "roberta-base";

lazy_static! {
    /// Available models by Hub id
    pub static ref MODELS_BY_NAME: HashMap<&'static str, Model> =
        MODELS.iter().map(|model| (model.name, *model)).collect();
}

impl TryFrom<&str> for Model {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        MODELS_BY_NAME
            .get(value)
            .copied()
            .ok_or_else(|| ModelError::Unknown(value.to_string()))
    }
}

/// Model Error
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    /// No model found for the given string
    #[error("no model found for {0} (expected one of: {})", supported())]
    Unknown(String),
}

fn supported() -> String {
    MODELS
        .iter()
        .map(|model| model.name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn resolves_known_models() {
        let model = Model::try_from("bert-base-uncased").expect("known model");

        assert_eq!(model.name(), "bert-base-uncased");
        assert_eq!(model.family(), Family::Bert);
        assert_eq!(
            Model::try_from(DEFAULT_MODEL).map(|model| model.family()).ok(),
            Some(Family::Roberta)
        );
    }

    #[test]
    fn rejects_unknown_models_with_the_supported_list() {
        let error = Model::try_from("gpt2").expect_err("unknown model");

        assert_eq!(
            error.to_string(),
            "no model found for gpt2 (expected one of: roberta-base, roberta-large, \
             bert-base-uncased, bert-base-cased, bert-large-uncased, bert-large-cased)"
        );
    }
}
