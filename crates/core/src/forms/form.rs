use super::context::EditContext;
use super::extensible::{ExtensibleEditContext, FormExtensionRegistration};
use crate::error::FormError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Called with the edit context that was submitted.
#[async_trait]
pub trait SubmitHandler: Send + Sync {
    async fn handle(&self, context: &EditContext);
}

/// Adapts a synchronous closure into a [`SubmitHandler`].
pub struct FnSubmitHandler<F>(pub F);

#[async_trait]
impl<F> SubmitHandler for FnSubmitHandler<F>
where
    F: Fn(&EditContext) + Send + Sync,
{
    async fn handle(&self, context: &EditContext) {
        (self.0)(context)
    }
}

/// Exactly one of `model` and `edit_context` must be given.
fn build_edit_context(
    model: Option<Value>,
    edit_context: Option<EditContext>,
) -> Result<EditContext, FormError> {
    match (model, edit_context) {
        (Some(model), None) => Ok(EditContext::new(model)),
        (None, Some(context)) => Ok(context),
        _ => Err(FormError::MissingModel),
    }
}

/// A form whose submission also validates and notifies registered extensions.
pub struct ExtensibleEditForm {
    context: ExtensibleEditContext,
    on_valid_submit: Option<Arc<dyn SubmitHandler>>,
    on_invalid_submit: Option<Arc<dyn SubmitHandler>>,
}

impl ExtensibleEditForm {
    pub fn new(model: Option<Value>, edit_context: Option<EditContext>) -> Result<Self, FormError> {
        let root = build_edit_context(model, edit_context)?;
        Ok(Self {
            context: ExtensibleEditContext::new(root),
            on_valid_submit: None,
            on_invalid_submit: None,
        })
    }

    pub fn on_valid_submit(mut self, handler: impl SubmitHandler + 'static) -> Self {
        self.on_valid_submit = Some(Arc::new(handler));
        self
    }

    pub fn on_invalid_submit(mut self, handler: impl SubmitHandler + 'static) -> Self {
        self.on_invalid_submit = Some(Arc::new(handler));
        self
    }

    /// Re-applies parameters. A new edit context, or a model different from
    /// the current root's, replaces the root; extensions stay registered.
    pub fn set_parameters(
        &mut self,
        model: Option<Value>,
        edit_context: Option<EditContext>,
    ) -> Result<(), FormError> {
        let replace = match (&model, &edit_context) {
            (Some(model), None) => model != self.context.root().model(),
            (None, Some(_)) => true,
            _ => return Err(FormError::MissingModel),
        };
        if replace {
            self.context.replace_root(build_edit_context(model, edit_context)?);
        }
        Ok(())
    }

    pub fn context(&self) -> &ExtensibleEditContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ExtensibleEditContext {
        &mut self.context
    }

    /// Validates everything, then runs the form's own handler followed by the
    /// extensions' handlers of the matching kind. Returns the validity.
    pub async fn submit(&mut self) -> bool {
        let valid = self.context.validate();
        tracing::debug!("Form submitted, valid: {}", valid);

        if valid {
            if let Some(handler) = &self.on_valid_submit {
                handler.handle(self.context.root()).await;
            }
            self.context.on_valid_submit().await;
        } else {
            if let Some(handler) = &self.on_invalid_submit {
                handler.handle(self.context.root()).await;
            }
            self.context.on_invalid_submit().await;
        }
        valid
    }
}

/// A plugin-side form section bound to a host's [`ExtensibleEditContext`].
#[derive(Default)]
pub struct EditFormExtension {
    registration: Option<FormExtensionRegistration>,
    on_valid_submit: Option<Arc<dyn SubmitHandler>>,
    on_invalid_submit: Option<Arc<dyn SubmitHandler>>,
}

impl EditFormExtension {
    pub fn new(
        on_invalid_submit: Option<Arc<dyn SubmitHandler>>,
        on_valid_submit: Option<Arc<dyn SubmitHandler>>,
    ) -> Self {
        Self {
            registration: None,
            on_valid_submit,
            on_invalid_submit,
        }
    }

    pub fn registration(&self) -> Option<FormExtensionRegistration> {
        self.registration
    }

    /// Registers with `host`, re-registering when the edit context or model changed.
    pub fn set_parameters(
        &mut self,
        host: &mut ExtensibleEditContext,
        model: Option<Value>,
        edit_context: Option<EditContext>,
    ) -> Result<FormExtensionRegistration, FormError> {
        let current = self
            .registration
            .and_then(|r| host.extension_context(r).map(|c| (r, c)));

        if let (Some((registration, context)), Some(model), None) = (current, &model, &edit_context) {
            if context.model() == model {
                return Ok(registration);
            }
        }

        let context = build_edit_context(model, edit_context)?;
        if let Some(registration) = self.registration.take() {
            host.unregister_extension(registration)?;
        }
        let registration = host.register_extension(
            context,
            self.on_invalid_submit.clone(),
            self.on_valid_submit.clone(),
        );
        self.registration = Some(registration);
        Ok(registration)
    }

    pub fn dispose(&mut self, host: &mut ExtensibleEditContext) -> Result<(), FormError> {
        match self.registration.take() {
            Some(registration) => host.unregister_extension(registration),
            None => Ok(()),
        }
    }
}
