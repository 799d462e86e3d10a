//! HTTP surface for the companion process

pub mod health;
pub mod messages;

pub use health::health_routes;
pub use messages::message_routes;
