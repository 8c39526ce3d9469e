mod context;
pub mod controller;
mod error;
pub mod metrics;
pub mod notify;
pub mod policy;
mod runtime;
pub mod store;
pub mod taint;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use context::Context;
pub use controller::{Outcome, SkipReason, reconcile};
pub use error::Error;
pub use policy::{TaintEffect, TaintPolicy};
pub use runtime::{Settings, start_taint_controller};
pub use trigger::TriggerMode;

pub type Result<T> = std::result::Result<T, Error>;
