//! Shared types, enums, and error definitions for the reconnaissance core.
//!
//! This crate contains no I/O — only pure data structures used by all other
//! crates.

pub mod device;
pub mod error;
pub mod event;
pub mod geolocation;
pub mod network;
pub mod port;
pub mod system_status;
pub mod web_service;
