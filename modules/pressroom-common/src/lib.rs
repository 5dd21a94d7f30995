pub mod config;
pub mod error;
pub mod types;
pub mod urls;

pub use config::{Config, DiscoveryConfig, NegativeCache};
pub use error::PressroomError;
pub use types::*;
pub use urls::{domain_of, is_same_site, normalize_domain, parse_web_url, resolve_relative};
