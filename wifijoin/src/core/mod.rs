//! Core join logic.
//!
//! This module contains the platform-independent pieces of a join attempt:
//! error translation, identity polling, traffic binding and the state
//! machine that ties them together.

pub(crate) mod binding;
pub(crate) mod error_map;
pub(crate) mod orchestrator;
pub(crate) mod poller;
