//! Error taxonomy and the tagged result returned by timeline operators.

use serde::{Deserialize, Serialize};

/// Errors raised inside the engine.
///
/// Most of them never reach a caller: operators turn them into
/// [`Outcome::Unchanged`] and the preset cache turns source failures into an
/// empty list. Only playback calls addressed to an unregistered target surface one.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MotionError {
    /// Target handle was never registered (or already unregistered)
    #[error("Target not registered: {target}")]
    UnknownTarget { target: u32 },

    /// Target is registered but has nothing playing
    #[error("Target {target} has no active playback")]
    NotPlaying { target: u32 },

    /// Arithmetic produced NaN or infinity
    #[error("Non-finite value in {operation}: {field}")]
    NonFinite { operation: String, field: String },

    /// Operator parameter outside its domain
    #[error("Invalid parameter for {operation}: {reason}")]
    InvalidParameter { operation: String, reason: String },

    /// Remote preset source failed
    #[error("Preset source error: {reason}")]
    Source { reason: String },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },
}

impl MotionError {
    pub(crate) fn non_finite(operation: &str, field: &str) -> Self {
        Self::NonFinite {
            operation: operation.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(operation: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownTarget { .. } | Self::NotPlaying { .. } => "playback",
            Self::NonFinite { .. } | Self::InvalidParameter { .. } => "transform",
            Self::Source { .. } => "source",
            Self::SerializationError { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for MotionError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

/// Result of a timeline operator.
///
/// `Unchanged` always carries the caller's original input, either because the
/// operator was a no-op for its parameters or because it failed internally.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    Unchanged(T),
}

impl<T> Outcome<T> {
    #[inline]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[inline]
    pub fn as_ref(&self) -> &T {
        match self {
            Self::Applied(v) | Self::Unchanged(v) => v,
        }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            Self::Applied(v) | Self::Unchanged(v) => v,
        }
    }
}

/// Run an operator body and fold its result into an [`Outcome`].
///
/// `Ok(None)` means the operator declined (no-op parameters); `Err` is logged and
/// also yields the original.
pub(crate) fn fail_soft<T: Clone>(
    operation: &str,
    original: &T,
    body: impl FnOnce() -> crate::Result<Option<T>>,
) -> Outcome<T> {
    match body() {
        Ok(Some(value)) => Outcome::Applied(value),
        Ok(None) => Outcome::Unchanged(original.clone()),
        Err(err) => {
            log::warn!(
                "{operation} declined ({}): {err}; keeping input timeline",
                err.category()
            );
            Outcome::Unchanged(original.clone())
        }
    }
}
