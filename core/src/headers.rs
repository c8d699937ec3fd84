//! Header precedence merging.
//!
//! Every call sends the union of three header sources. When a key appears in
//! more than one source the later source wins:
//!
//! ```text
//! engine defaults  <  endpoint static headers  <  call overrides
//! ```
//!
//! Keys are compared byte-for-byte: `X-Trace` and `x-trace` are different
//! keys and both are sent.

use std::collections::BTreeMap;

/// Header map used throughout relaykit.
///
/// Ordered so that merged headers (and the trace payloads that contain them)
/// serialize deterministically.
pub type HeaderMap = BTreeMap<String, String>;

/// Merge three header maps by precedence.
///
/// Pure and deterministic: the inputs are only read, and for every key the
/// result holds the value from the last map that contains it.
///
/// # Example
///
/// ```
/// use relaykit_core::headers::{merge, HeaderMap};
///
/// let defaults = HeaderMap::from([("X-Default".into(), "1".into())]);
/// let endpoint = HeaderMap::from([
///     ("X-Default".into(), "2".into()),
///     ("X-E".into(), "e".into()),
/// ]);
/// let call = HeaderMap::from([("X-Default".into(), "3".into())]);
///
/// let merged = merge(&defaults, &endpoint, &call);
/// assert_eq!(merged["X-Default"], "3");
/// assert_eq!(merged["X-E"], "e");
/// assert_eq!(merged.len(), 2);
/// ```
#[must_use]
pub fn merge(defaults: &HeaderMap, endpoint: &HeaderMap, call: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    for layer in [endpoint, call] {
        merged.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}
