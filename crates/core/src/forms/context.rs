use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessage {
    /// Field the message refers to; `None` for model-level messages.
    pub field: Option<String>,
    pub message: String,
}

impl ValidationMessage {
    pub fn model(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

pub trait Validator: Send + Sync {
    fn validate(&self, model: &Value) -> Vec<ValidationMessage>;
}

/// Adapts a closure into a [`Validator`].
pub struct FnValidator<F>(pub F);

impl<F> Validator for FnValidator<F>
where
    F: Fn(&Value) -> Vec<ValidationMessage> + Send + Sync,
{
    fn validate(&self, model: &Value) -> Vec<ValidationMessage> {
        (self.0)(model)
    }
}

/// A model under edit together with its validators and their last result.
#[derive(Clone)]
pub struct EditContext {
    model: Value,
    validators: Vec<Arc<dyn Validator>>,
    messages: Vec<ValidationMessage>,
}

impl EditContext {
    pub fn new(model: Value) -> Self {
        Self {
            model,
            validators: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn model(&self) -> &Value {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Value {
        &mut self.model
    }

    /// Runs every validator and keeps the combined messages.
    pub fn validate(&mut self) -> bool {
        self.messages = self
            .validators
            .iter()
            .flat_map(|v| v.validate(&self.model))
            .collect();
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    pub fn field_messages<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.messages
            .iter()
            .filter(move |m| m.field.as_deref() == Some(field))
            .map(|m| m.message.as_str())
    }
}

impl fmt::Debug for EditContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditContext")
            .field("model", &self.model)
            .field("validators", &self.validators.len())
            .field("messages", &self.messages)
            .finish()
    }
}
