//! User-facing interfaces over the service layer

pub mod cli;
