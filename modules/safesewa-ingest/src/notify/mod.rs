//! Push notification gateway. Delivery is fire-and-forget: failures are
//! logged and never roll back or fail the ingest that triggered them.

mod backend;
mod noop;
mod push;

pub use backend::NotifyBackend;
pub use noop::NoopNotify;
pub use push::PushGateway;
