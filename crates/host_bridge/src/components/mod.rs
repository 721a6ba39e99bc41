//! Synchronized state components layered over [`HostBridge`](crate::bridge::HostBridge).
//!
//! Every committing setter follows the same sequence: no-op on equality, capability gate, cache
//! update, outbound post, change event. A failed post restores the previous value and emits
//! nothing.

use std::cell::RefCell;

use crate::error::BridgeError;

pub mod back_button;
pub mod haptic;
pub mod host_app;
pub mod main_button;
pub mod popup;
pub mod theme;
pub mod viewport;

/// Applies `value` to the field selected by `field` inside `state`.
///
/// Returns `Ok(false)` without calling `gate` or `post` when the value is unchanged, and
/// `Ok(true)` after a successful post. `post` sees the updated snapshot; no borrow is held while
/// it runs.
pub(crate) fn commit<S, T>(
    state: &RefCell<S>,
    field: impl Fn(&mut S) -> &mut T,
    value: T,
    gate: impl FnOnce() -> Result<(), BridgeError>,
    post: impl FnOnce(&S) -> Result<(), BridgeError>,
) -> Result<bool, BridgeError>
where
    S: Clone,
    T: PartialEq,
{
    if *field(&mut *state.borrow_mut()) == value {
        return Ok(false);
    }
    gate()?;

    let previous = std::mem::replace(field(&mut *state.borrow_mut()), value);
    let snapshot = state.borrow().clone();
    if let Err(err) = post(&snapshot) {
        *field(&mut *state.borrow_mut()) = previous;
        return Err(err);
    }
    Ok(true)
}
