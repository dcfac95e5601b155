//! Facade crate: `NetreconEngine` wiring every sub-crate together, plus
//! layered configuration loading. No CLI binary and no HTTP server live
//! here (§1's explicit non-goals); an external binary drives this library.

pub use netrecon_db as db;
pub use netrecon_events as events;
pub use netrecon_models as models;
pub use netrecon_parsers as parsers;
pub use netrecon_pipeline as pipeline;
pub use netrecon_platform as platform;
pub use netrecon_scan as scan;
pub use netrecon_scanner as scanner;

pub mod config;
pub mod engine;

pub use config::{load_config, ConfigError, NetreconConfig};
pub use engine::{EngineError, EngineResult, NetreconEngine};
