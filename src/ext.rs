//! Extension contracts for attaching issued tokens to downstream requests.

pub mod request_signer;

pub use request_signer::*;
