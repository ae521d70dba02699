//! Publish/subscribe fan-out for live clients.
//!
//! One hub per process. Subscribers are ephemeral: they exist only while a
//! transport connection is open, and the hub is the only component that may
//! touch the subscriber map. Delivery is best-effort: a slow subscriber
//! drops events rather than backpressuring the publisher, and the ping/pong
//! sweep evicts connections that stop responding.

mod hub;

pub use hub::{BroadcastHub, HubMessage, Subscription};
