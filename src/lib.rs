//! Membership administration for the Strength Gym portal.
//!
//! The library holds everything that is not terminal plumbing: the session
//! store, the HTTP gateway to the membership backend, plan date arithmetic,
//! the roster view-model and the admin workflows. `main.rs` wires these into
//! the terminal screens under [`ui`].

pub mod api;
pub mod config;
pub mod expiry;
pub mod models;
pub mod roster;
pub mod session;
pub mod ui;
pub mod workflow;
