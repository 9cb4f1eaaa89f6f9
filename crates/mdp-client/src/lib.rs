//! Command layer for the MDP-M01/M02 driver.
//!
//! Action-based: [`Client`] receives events ([`ClientEvent`]), processes
//! them through pure state-machine logic, and returns actions
//! ([`ClientAction`]) for the caller to execute against a transport. It
//! never touches bytes or I/O itself — that's `mdp-runtime`'s job.
//!
//! # Components
//!
//! - [`Client`]: channel store, optimistic output-toggle state machine,
//!   heartbeat schedule.
//! - [`bus::EventBus`]: synchronous, in-order publish/subscribe with
//!   cancel handles.
//! - [`heartbeat::HeartbeatSchedule`]: a pure next-action-at(now) query.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bus;
mod client;
mod error;
mod event;
mod heartbeat;

pub use bus::{EventBus, SubscriptionId};
pub use client::{Client, ClientConfig, TOGGLE_TIMEOUT};
pub use error::CommandError;
pub use event::{ClientAction, ClientEvent};
pub use heartbeat::{HeartbeatSchedule, HEARTBEAT_INTERVAL};
pub use mdp_core::Environment;
