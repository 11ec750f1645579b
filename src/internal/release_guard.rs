//! Panic isolation for release actions.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::disposable::ReleaseFn;
use crate::error::LifecycleError;

/// Runs a release action, turning both errors and panics into a
/// [`LifecycleError`] so the caller can keep draining.
pub(crate) fn guarded_release(label: &str, action: ReleaseFn) -> Result<(), LifecycleError> {
    match panic::catch_unwind(AssertUnwindSafe(action)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(LifecycleError::ReleaseFailed {
            label: label.to_string(),
            message: err.message().to_string(),
        }),
        Err(payload) => Err(LifecycleError::ReleasePanicked {
            label: label.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
