//! Array Mutation Interception
//!
//! Index assignment cannot be intercepted on a plain sequence, so arrays
//! funnel their seven mutating operations through [`intercept`] instead.
//! [`Array`] calls it after performing the plain operation and before
//! returning the plain result to the caller, so the operation's return value
//! is unchanged by observation.

use super::{observe, observer_for};
use crate::value::{Array, Value};

/// The mutating operations that notify an observed array's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayMethod {
    Push,
    Pop,
    Shift,
    Unshift,
    Splice,
    Sort,
    Reverse,
}

impl ArrayMethod {
    pub const ALL: [ArrayMethod; 7] = [
        ArrayMethod::Push,
        ArrayMethod::Pop,
        ArrayMethod::Shift,
        ArrayMethod::Unshift,
        ArrayMethod::Splice,
        ArrayMethod::Sort,
        ArrayMethod::Reverse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArrayMethod::Push => "push",
            ArrayMethod::Pop => "pop",
            ArrayMethod::Shift => "shift",
            ArrayMethod::Unshift => "unshift",
            ArrayMethod::Splice => "splice",
            ArrayMethod::Sort => "sort",
            ArrayMethod::Reverse => "reverse",
        }
    }

    /// Whether the operation can insert new elements.
    ///
    /// For `splice` only the trailing items count as inserted, never the
    /// start index or delete count.
    pub fn inserts(self) -> bool {
        matches!(
            self,
            ArrayMethod::Push | ArrayMethod::Unshift | ArrayMethod::Splice
        )
    }
}

/// Post-mutation hook: observe what was inserted, then notify the array's
/// own registry. Does nothing for arrays that are not observed.
pub(crate) fn intercept(array: &Array, method: ArrayMethod, inserted: &[Value]) {
    debug_assert!(method.inserts() || inserted.is_empty());

    let Some(observer) = observer_for(array.id()) else {
        return;
    };

    for value in inserted {
        observe(value);
    }

    tracing::trace!(
        node = array.id().raw(),
        method = method.name(),
        inserted = inserted.len(),
        "array mutation"
    );
    observer.notify();
}
