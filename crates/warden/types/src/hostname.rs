//! Scale set host name codec.
//!
//! Scale set instances get host names of the form `{prefix}{suffix}` where
//! the suffix is the instance ordinal in upper-case base 36, left-padded with
//! `0` to [`HOST_NAME_SUFFIX_LEN`] characters.

use crate::error::HostNameError;

/// Width of the base-36 ordinal suffix.
pub const HOST_NAME_SUFFIX_LEN: usize = 6;

const RADIX: u64 = 36;

/// Decode the instance ordinal from the last six characters of a host name.
///
/// Lower-case letters decode like their upper-case counterparts.
pub fn host_name_to_instance_id(name: &str) -> Result<u64, HostNameError> {
    if name.is_empty() {
        return Err(HostNameError::Empty);
    }

    let chars: Vec<char> = name.chars().collect();
    let start = chars.len().saturating_sub(HOST_NAME_SUFFIX_LEN);
    let suffix: String = chars[start..].iter().collect();
    let digits = suffix.trim_start_matches('0');

    let mut id = 0u64;
    let mut multiplier = 1u64;
    for c in digits.chars().rev() {
        let value = c
            .to_ascii_uppercase()
            .to_digit(RADIX as u32)
            .ok_or_else(|| HostNameError::InvalidDigit {
                host_name: name.to_string(),
                digit: c,
            })?;
        id += u64::from(value) * multiplier;
        multiplier *= RADIX;
    }

    Ok(id)
}

/// Encode an instance ordinal into a host name with the given prefix.
pub fn instance_to_host_name(prefix: &str, id: u64) -> String {
    let mut digits = Vec::new();
    let mut rest = id;
    while rest > 0 {
        let value = (rest % RADIX) as u32;
        // from_digit yields lower-case letters
        if let Some(c) = char::from_digit(value, RADIX as u32) {
            digits.push(c.to_ascii_uppercase());
        }
        rest /= RADIX;
    }
    let encoded: String = digits.iter().rev().collect();

    format!("{prefix}{encoded:0>width$}", width = HOST_NAME_SUFFIX_LEN)
}
