pub mod csv_handler;
pub mod qr;
pub mod slug;
pub mod time_parser;
pub mod url_validator;

pub use time_parser::TimeParser;

/// Random alphanumeric id suffix
pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}
