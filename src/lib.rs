//! Coaster admin - data core of an NFC coaster coffee-shop console
//!
//! Every coaster carries an NFC chip tied to one coffee bean. Phones that
//! read a chip produce scan events; this crate keeps the bean catalog and
//! the scan log, and turns the log into dashboard summaries.
//!
//! # Architecture
//! - `analytics`: scan events, filtering, aggregation, realtime feed
//! - `services`: catalog, analytics, URL generator, sheet sync, cafe profile
//! - `storage`: key-value persistence of the JSON collections
//! - `config`: TOML + environment configuration
//! - `interfaces`: command-line interface
//! - `system`: logging and the injectable clock
//! - `utils`: slugs, QR codes, CSV mapping, URL checks, time parsing

pub mod analytics;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
