//! Configuration for the file browser.
//!
//! Settings ([`settings::FilesConfig`]) are stored as a TOML file and loaded
//! by the host at startup.

pub mod settings;

pub use settings::{FilesConfig, ListingConfig, SortConfig};
