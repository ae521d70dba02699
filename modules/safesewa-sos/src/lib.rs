//! SOS session lifecycle: creation, volunteer acceptance, location refresh,
//! terminal resolution/expiry. All mutations are serialized per session by
//! the record store's conditional update; acceptance is first-writer-wins.

mod error;
mod manager;

pub use error::SosError;
pub use manager::SosManager;
