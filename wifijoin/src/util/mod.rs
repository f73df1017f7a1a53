//! Utility functions and helpers.

pub(crate) mod utils;
