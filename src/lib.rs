//! # peer-reconnect
//!
//! Reconnection controller for a peer-to-peer networking layer. When a peer
//! connection drops, the controller re-dials the address in the background
//! on a capped exponential backoff, gives up after a fixed time window or
//! iteration count, and never runs two retry loops for the same address.
//!
//! ```rust,no_run
//! use peer_reconnect::{ConnectionManager, PeerAddr, ReconnectConfig, ReconnectController};
//! use std::sync::Arc;
//!
//! # async fn example(conn: Arc<dyn ConnectionManager>) {
//! let controller = ReconnectController::new(ReconnectConfig::default());
//!
//! // Called by the host network whenever a peer goes away
//! controller.on_disconnect(PeerAddr::from("10.0.0.1:9000"), conn);
//!
//! controller.wait_idle().await;
//! # }
//! ```
//!
//! The dial/connectivity side of the network stack is supplied through
//! [`ConnectionManager`]; hosts that dispatch disconnect events through a
//! plugin system can hold the controller as a [`PeerDisconnectHandler`].

pub mod backoff;
pub mod config;
pub mod connection;
pub mod controller;
pub mod error;
pub mod logging;
pub mod registry;
pub mod task;
pub mod types;

pub use backoff::{Backoff, BackoffPolicy};
pub use config::ReconnectConfig;
pub use connection::{ConnectionManager, PeerDisconnectHandler};
pub use controller::ReconnectController;
pub use error::{ReconnectError, Result};
pub use logging::init_tracing;
pub use registry::{BackoffGuard, BackoffRegistry, Step};
pub use task::RetryTasks;
pub use types::*;
