//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (VAULT_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → VaultConfig (validated, immutable)
//!     → passed by reference into each constructor
//! ```
//!
//! # Design Decisions
//! - Config is built once at startup; nothing reads process state afterwards
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError};
pub use schema::{
    AssetConfig, CacheConfig, LedgerConfig, MockConfig, NetworkConfig, ObservabilityConfig,
    TransactionConfig, VaultConfig, VaultSettings, WalletConfig,
};
pub use validation::{validate_config, ValidationError};
