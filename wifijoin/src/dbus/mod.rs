//! D-Bus proxy interfaces for NetworkManager.
//!
//! This module contains low-level D-Bus proxy definitions for communicating
//! with NetworkManager over the system bus.

mod access_point;
mod device;
mod main_nm;
mod wireless;

pub(crate) use access_point::NMAccessPointProxy;
pub(crate) use device::NMDeviceProxy;
pub(crate) use main_nm::NMProxy;
pub(crate) use wireless::NMWirelessProxy;
