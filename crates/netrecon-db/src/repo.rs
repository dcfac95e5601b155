//! Repository implementations for the reconnaissance schema: networks,
//! devices, ports, web services, event logs, system status, and the
//! geolocation cache.

pub mod devices;
pub mod event_logs;
pub mod geolocation;
pub mod networks;
pub mod ports;
pub mod system_status;
pub mod web_services;
