//! Service layer
//!
//! Each service owns one persisted collection, loads it from the
//! [`KeyValueStore`](crate::storage::KeyValueStore) on construction and writes
//! it back after every mutation. Interfaces (the CLI) only talk to services.

mod analytics_service;
mod cafe_service;
mod catalog_service;
mod sheets_service;
mod url_service;

pub use analytics_service::*;
pub use cafe_service::*;
pub use catalog_service::*;
pub use sheets_service::*;
pub use url_service::*;
