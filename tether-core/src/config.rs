//! Observation Configuration
//!
//! A per-thread switch controlling whether [`observe`](crate::observe)
//! instruments anything at all. Turning it off is useful while building a
//! large structure that should stay plain, e.g. data handed to a renderer
//! that will never be mutated.
//!
//! The switch only affects *new* observations. Nodes that are already
//! observed keep their reactive properties and registries.

use std::cell::Cell;

thread_local! {
    static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Enable or disable observation on the current thread.
pub fn toggle_observing(enabled: bool) {
    SHOULD_OBSERVE.with(|flag| flag.set(enabled));
}

/// Whether `observe` currently instruments new nodes on this thread.
pub fn should_observe() -> bool {
    SHOULD_OBSERVE.with(|flag| flag.get())
}

/// Run `f` with observation disabled, restoring the previous setting after.
pub fn without_observing<T>(f: impl FnOnce() -> T) -> T {
    struct Restore(bool);

    impl Drop for Restore {
        fn drop(&mut self) {
            toggle_observing(self.0);
        }
    }

    let _restore = Restore(should_observe());
    toggle_observing(false);
    f()
}
