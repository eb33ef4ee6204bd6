//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, fall back to defaults)
//!     → loader.rs (environment overrides)
//!     → validation.rs (semantic checks)
//!     → DispatchConfig (validated, immutable)
//!     → handed to lifecycle::startup to wire subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AuthorityConfig, DispatchConfig, NotificationConfig, ObservabilityConfig, RateLimitConfig,
    ResilienceSettings, ServerConfig, StoreConfig, WorkerConfig,
};
