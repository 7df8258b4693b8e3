use super::context::EditContext;
use super::form::SubmitHandler;
use crate::error::FormError;
use std::sync::Arc;

/// Handle of an extension registered with an [`ExtensibleEditContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormExtensionRegistration(pub u64);

struct FormExtension {
    registration: FormExtensionRegistration,
    context: EditContext,
    on_invalid_submit: Option<Arc<dyn SubmitHandler>>,
    on_valid_submit: Option<Arc<dyn SubmitHandler>>,
}

/// The root edit context of a form plus the contexts plugins attached to it.
pub struct ExtensibleEditContext {
    root: EditContext,
    extensions: Vec<FormExtension>,
    next_registration: u64,
}

impl ExtensibleEditContext {
    pub fn new(root: EditContext) -> Self {
        Self {
            root,
            extensions: Vec::new(),
            next_registration: 1,
        }
    }

    pub fn root(&self) -> &EditContext {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut EditContext {
        &mut self.root
    }

    pub fn replace_root(&mut self, root: EditContext) {
        self.root = root;
    }

    pub fn register_extension(
        &mut self,
        context: EditContext,
        on_invalid_submit: Option<Arc<dyn SubmitHandler>>,
        on_valid_submit: Option<Arc<dyn SubmitHandler>>,
    ) -> FormExtensionRegistration {
        let registration = FormExtensionRegistration(self.next_registration);
        self.next_registration += 1;
        self.extensions.push(FormExtension {
            registration,
            context,
            on_invalid_submit,
            on_valid_submit,
        });
        registration
    }

    pub fn unregister_extension(
        &mut self,
        registration: FormExtensionRegistration,
    ) -> Result<(), FormError> {
        let index = self
            .extensions
            .iter()
            .position(|e| e.registration == registration)
            .ok_or(FormError::UnknownRegistration(registration.0))?;
        self.extensions.remove(index);
        Ok(())
    }

    pub fn extension_context(&self, registration: FormExtensionRegistration) -> Option<&EditContext> {
        self.extensions
            .iter()
            .find(|e| e.registration == registration)
            .map(|e| &e.context)
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }

    /// Validates the root and every extension; valid only if all are.
    pub fn validate(&mut self) -> bool {
        let mut valid = self.root.validate();
        for extension in &mut self.extensions {
            valid &= extension.context.validate();
        }
        valid
    }

    /// Runs the extensions' valid-submit handlers in registration order.
    pub async fn on_valid_submit(&self) {
        for extension in &self.extensions {
            if let Some(handler) = &extension.on_valid_submit {
                handler.handle(&extension.context).await;
            }
        }
    }

    pub async fn on_invalid_submit(&self) {
        for extension in &self.extensions {
            if let Some(handler) = &extension.on_invalid_submit {
                handler.handle(&extension.context).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FnValidator, ValidationMessage};
    use serde_json::{Value, json};

    fn failing() -> EditContext {
        EditContext::new(json!({}))
            .with_validator(FnValidator(|_: &Value| vec![ValidationMessage::model("nope")]))
    }

    #[test]
    fn test_validate_runs_every_context() {
        let mut context = ExtensibleEditContext::new(failing());
        let registration = context.register_extension(failing(), None, None);

        assert!(!context.validate());
        assert_eq!(context.root().messages().len(), 1);
        assert_eq!(
            context.extension_context(registration).unwrap().messages().len(),
            1
        );
    }

    #[test]
    fn test_unregister_unknown_fails() {
        let mut context = ExtensibleEditContext::new(EditContext::new(json!({})));
        let registration = context.register_extension(EditContext::new(json!({})), None, None);

        context.unregister_extension(registration).unwrap();
        assert_eq!(
            context.unregister_extension(registration),
            Err(FormError::UnknownRegistration(registration.0))
        );
        assert_eq!(context.extension_count(), 0);
    }
}
