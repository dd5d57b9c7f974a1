//! Domain layer: value objects, the one-time-code state machine and the
//! ports every external collaborator is reached through.

pub mod cart;
pub mod money;
pub mod order;
pub mod otp;
pub mod payment;
pub mod ports;
pub mod session;
