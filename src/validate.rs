//! Validators — pluggable checks on normalized text.
//!
//! Validation runs strictly after normalization and before conversion. A
//! failing validation aborts the field with a typed error naming the field
//! and the rejected value; it is never silently swallowed.

use std::sync::Arc;

use crate::bind::BindingContext;
use crate::error::{BindError, Result};

/// Pluggable validation strategy.
pub trait Validate: Send + Sync {
    /// Check the context's normalized text; `Err` aborts the field.
    fn validate(&self, cx: &BindingContext<'_, '_>) -> Result<()>;
}

/// Built-in validator kinds, resolved once per rule.
#[derive(Clone)]
pub enum Validator {
    /// Always passes (the default).
    Pass,
    /// Fails if the normalized text is empty.
    NotEmpty,
    /// Caller-provided strategy.
    Custom(Arc<dyn Validate>),
}

impl Validator {
    pub(crate) fn check(&self, cx: &BindingContext<'_, '_>) -> Result<()> {
        match self {
            Self::Pass => Ok(()),
            Self::NotEmpty => {
                if cx.text().is_empty() {
                    Err(BindError::validation(
                        cx.field(),
                        cx.text(),
                        "value must not be empty",
                    ))
                } else {
                    Ok(())
                }
            }
            Self::Custom(validator) => validator.validate(cx),
        }
    }
}
