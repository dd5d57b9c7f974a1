//! Application layer orchestrating a checkout.
//!
//! `CheckoutOrchestrator` is the entry point for a single session. It is
//! driven either directly (`&mut self` actions) or through `CheckoutActor`,
//! which owns it behind `tokio` channels so every mutation is serialized.

pub mod actor;
pub mod notifier;
pub mod orchestrator;
pub mod storefront;
pub mod submitter;
