//! Type definitions and constants.
//!
//! This module contains NetworkManager constants and verification defaults.

pub(crate) mod constants;
