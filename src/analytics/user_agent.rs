//! User-Agent → device metadata
//!
//! woothee gives a coarse category (`pc`, `smartphone`, `mobilephone`, ...).
//! Tablets are reported as smartphones, so iPads and Android devices without
//! the `Mobile` token are reclassified.

use woothee::parser::Parser;

use super::{DeviceInfo, DeviceType};

const UNKNOWN: &str = "UNKNOWN";

/// Parse a User-Agent string into the device fields of a scan event
pub fn classify(user_agent: &str) -> DeviceInfo {
    let parser = Parser::new();
    let Some(result) = parser.parse(user_agent) else {
        return DeviceInfo {
            device_type: DeviceType::Unknown,
            os: String::new(),
            browser: String::new(),
        };
    };

    let is_tablet = user_agent.contains("iPad")
        || (user_agent.contains("Android") && !user_agent.contains("Mobile"));

    let device_type = match result.category {
        "smartphone" | "mobilephone" if is_tablet => DeviceType::Tablet,
        "smartphone" | "mobilephone" => DeviceType::Mobile,
        "pc" => DeviceType::Desktop,
        _ => DeviceType::Unknown,
    };

    DeviceInfo {
        device_type,
        os: known(result.os),
        browser: known(result.name),
    }
}

fn known(value: &str) -> String {
    if value == UNKNOWN {
        String::new()
    } else {
        value.to_string()
    }
}
