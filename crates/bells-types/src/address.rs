//! Address translation between ledger account URLs and prefixed addresses.
//!
//! A ledger account lives at a URL like `http://red.example/accounts/mike`;
//! the generic side refers to the same account as `example.red.mike`, where
//! `example.red.` is the ledger prefix. Translation is pure string work:
//! no I/O, no state.

use crate::error::{PluginError, PluginResult};

/// Convert a prefixed address into a ledger account URL.
///
/// Strips `prefix` from `address` and appends the remaining account name to
/// `{ledger_base}/accounts/`. Fails when the address does not carry the
/// expected prefix.
pub fn to_ledger_account(ledger_base: &str, prefix: &str, address: &str) -> PluginResult<String> {
    let name = address.strip_prefix(prefix).ok_or_else(|| {
        PluginError::InvalidFields(format!(
            "Destination address \"{address}\" must start with ledger prefix \"{prefix}\""
        ))
    })?;
    Ok(format!("{}/accounts/{}", ledger_base.trim_end_matches('/'), name))
}

/// Convert a ledger account URL into a prefixed address.
///
/// The account name is the trailing path segment of the URL.
pub fn to_generic_address(prefix: &str, account_url: &str) -> String {
    format!("{prefix}{}", account_name(account_url))
}

/// The trailing path segment of an account URL.
pub fn account_name(account_url: &str) -> &str {
    account_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(account_url)
}
