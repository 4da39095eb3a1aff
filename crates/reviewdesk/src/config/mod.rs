pub mod loader;
pub mod schema;

pub use loader::{
    default_config_path, load_config, load_config_from_str, resolve_config, validate_server_url,
};
pub use schema::{
    AcceptConfig, ApiKeysConfig, ClientConfig, InFlightPolicy, KeySourceConfig, LogConfig,
    LogFormat,
};
