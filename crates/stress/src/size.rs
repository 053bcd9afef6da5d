//! Size-string parsing
//!
//! Accepts digits followed by `MB` or `GB`, case-insensitive on the
//! unit. `MB` is 1024² bytes and `GB` is 1024³. A malformed string is a
//! hard input error: the worker refuses to start rather than guessing.

use thiserror::Error;

pub const MIB: u64 = 1024 * 1024;
pub const GIB: u64 = 1024 * MIB;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeError {
    #[error("invalid size `{0}`: expected a number followed by MB or GB, e.g. 100MB or 1GB")]
    Invalid(String),
}

/// Parse a size string such as `100MB` or `1GB` into bytes.
pub fn parse_size(input: &str) -> Result<u64, SizeError> {
    let invalid = || SizeError::Invalid(input.to_string());

    let upper = input.trim().to_ascii_uppercase();
    let digits_end = upper
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (digits, unit) = upper.split_at(digits_end);
    if digits.is_empty() {
        return Err(invalid());
    }

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let multiplier = match unit {
        "MB" => MIB,
        "GB" => GIB,
        _ => return Err(invalid()),
    };

    value.checked_mul(multiplier).ok_or_else(invalid)
}

/// clap adapter for `value_parser`.
pub fn parse_size_arg(input: &str) -> Result<u64, String> {
    parse_size(input).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn megabytes_and_gigabytes() {
        assert_eq!(parse_size("100MB"), Ok(104_857_600));
        assert_eq!(parse_size("1GB"), Ok(1_073_741_824));
        assert_eq!(parse_size("0MB"), Ok(0));
    }

    #[test]
    fn unit_is_case_insensitive() {
        assert_eq!(parse_size("100mb"), Ok(104_857_600));
        assert_eq!(parse_size("1gb"), Ok(1_073_741_824));
        assert_eq!(parse_size("50Mb"), Ok(50 * MIB));
    }

    #[test]
    fn missing_or_unknown_unit_is_rejected() {
        assert!(parse_size("100").is_err());
        assert!(parse_size("100KB").is_err());
        assert!(parse_size("100TB").is_err());
        assert!(parse_size("100 MB").is_err());
    }

    #[test]
    fn missing_digits_is_rejected() {
        assert!(parse_size("MB").is_err());
        assert!(parse_size("").is_err());
        assert!(parse_size("-5MB").is_err());
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(parse_size("99999999999999MB").is_err());
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        assert_eq!(parse_size(" 100MB "), Ok(104_857_600));
    }
}
