//! Web layer for mailrelay.
//!
//! Serves the contact form, accepts its submissions and publishes the API
//! documentation.

pub mod docs;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod tls;

pub use error::FormRejection;
pub use router::create_router;
pub use server::{BoundAddrs, WebServer};
