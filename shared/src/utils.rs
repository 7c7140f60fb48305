//! # Shared Utility Functions
//!
//! ## Address Formatting
//!
//! - [`format_address`] - Format address with ellipsis (first N and last M characters)
//! - [`short_address`] - `0x1234...abcd` form used in headers and logs
//!
//! ## JSON-RPC Quantities
//!
//! - [`parse_quantity`] - Decode `0x`-prefixed hex quantities (`eth_chainId`, `eth_getBalance`)
//!
//! ```rust
//! use shared::utils::{parse_quantity, short_address};
//!
//! assert_eq!(parse_quantity("0xaa36a7"), Some(11155111));
//! assert_eq!(short_address("0x52908400098527886E0F7030069857D2E4169EE7"), "0x5290...9EE7");
//! ```

/// Format a wallet address by showing the first `prefix_len` and last `suffix_len` characters.
///
/// If the address is shorter than `prefix_len + suffix_len`, it is returned as-is.
///
/// ```rust
/// use shared::utils::format_address;
///
/// let addr = "0x52908400098527886E0F7030069857D2E4169EE7";
/// assert_eq!(format_address(addr, 4, 4), "0x52...9EE7");
/// assert_eq!(format_address("short", 4, 4), "short");
/// ```
pub fn format_address(address: &str, prefix_len: usize, suffix_len: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    let len = chars.len();

    if len <= prefix_len + suffix_len {
        return address.to_string();
    }

    let prefix: String = chars[..prefix_len].iter().collect();
    let suffix: String = chars[len - suffix_len..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// Short display form: `0x` plus four characters, then the last four.
pub fn short_address(address: &str) -> String {
    format_address(address, 6, 4)
}

/// Parse a JSON-RPC quantity.
///
/// Accepts `0x`-prefixed hex (the wire format) and plain decimal strings,
/// which some wallets return for `eth_chainId`.
pub fn parse_quantity(value: &str) -> Option<u128> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        if hex.is_empty() {
            return None;
        }
        return u128::from_str_radix(hex, 16).ok();
    }
    value.parse::<u128>().ok()
}
