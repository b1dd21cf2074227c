//! Invocation module - correlation ids and response routing.
//!
//! Provides:
//! - [`InvocationRegistry`] - allocates correlation ids and holds the
//!   callers waiting on them
//! - [`Dispatch`] - outcome of routing one inbound message

mod registry;

pub use registry::{Dispatch, InvocationRegistry, ResponseReceiver, ResponseSender};
