//! Dependency Tracking
//!
//! This module holds the pieces observed properties talk to when they are
//! read or written: the per-property registry ([`Dep`]), the seam for
//! whatever wants to be notified ([`Subscriber`]), and the thread-local
//! stack that says who is currently evaluating ([`ReactiveContext`]).
//!
//! # Concepts
//!
//! ## Registries
//!
//! Every reactive property owns exactly one `Dep`. Reading the property while
//! a subscriber is evaluating records that subscriber; writing a different
//! value notifies everyone recorded, synchronously, in registration order.
//!
//! ## Context
//!
//! The context is owned by whoever drives evaluation. Code that is not
//! inside [`ReactiveContext::enter`] reads and writes normally and simply
//! establishes no dependency edges.
//!
//! ## Watchers
//!
//! [`Watcher`] is a ready-made subscriber that re-runs a closure when
//! anything it read changes. Rendering layers usually bring their own
//! subscriber instead.

mod context;
mod dep;
mod subscriber;
mod watcher;

pub use context::{untracked, ReactiveContext};
pub use dep::{Dep, DepId};
pub use subscriber::{Subscriber, SubscriberId};
pub use watcher::Watcher;
