//! Public API module.
//!
//! This module contains the user-facing types and the [`WifiJoin`](wifi_join::WifiJoin) handle.

pub mod config;
pub mod intent;
pub mod models;
pub mod wifi_join;
