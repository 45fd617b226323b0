//! Per-exchange processing options and their merge rules.
//!
//! Options flow in tiers: per-call values are preferred over client/server
//! defaults, which are preferred over the built-in defaults. Resolution
//! walks the tiers and takes the first usable value — "usable" meaning
//! positive for the sizes, non-zero for values where an explicit negative
//! is a meaningful "disabled" setting.

use std::collections::HashMap;

/// Default ceiling for an encoded header section, in bytes.
pub const DEFAULT_MAX_HEADERS_SIZE: usize = 8 * 1024;

/// Default ceiling for buffering a response body in memory: 128 MiB.
pub const DEFAULT_MAX_RESPONSE_BODY_SIZE: i64 = 128 * 1024 * 1024;

/// Options a caller may set per exchange or as client/server defaults.
///
/// `None` means "not set here, consult the next tier". For
/// `timeout_millis` and `max_response_body_size` an explicit non-positive
/// value is honored as "disabled" rather than falling through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingOptions {
    /// Deadline for the whole exchange; `<= 0` disables the deadline.
    pub timeout_millis: Option<i64>,
    /// Ceiling for an encoded or received header section.
    pub max_headers_size: Option<i64>,
    /// Ceiling for buffering a response body; `<= 0` disables the guard.
    pub max_response_body_size: Option<i64>,
    /// Whether the client buffers the response body before returning it.
    pub response_buffering_enabled: Option<bool>,
    /// Opaque key/value passthrough for the transport.
    pub extra_connectivity_params: HashMap<String, String>,
}

impl ProcessingOptions {
    /// Field-wise combination of two tiers, `preferred` winning wherever it
    /// has a value; connectivity params are unioned with `preferred`
    /// overriding colliding keys.
    pub fn merge(preferred: &Self, fallback: &Self) -> Self {
        let mut extra_connectivity_params = fallback.extra_connectivity_params.clone();
        extra_connectivity_params.extend(preferred.extra_connectivity_params.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            timeout_millis: preferred.timeout_millis.or(fallback.timeout_millis),
            max_headers_size: preferred.max_headers_size.or(fallback.max_headers_size),
            max_response_body_size: preferred.max_response_body_size.or(fallback.max_response_body_size),
            response_buffering_enabled: preferred.response_buffering_enabled.or(fallback.response_buffering_enabled),
            extra_connectivity_params,
        }
    }
}

/// Fully resolved options an exchange actually runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveOptions {
    pub timeout_millis: i64,
    pub max_headers_size: usize,
    pub max_response_body_size: i64,
    pub response_buffering_enabled: bool,
}

impl EffectiveOptions {
    /// Resolves tiers in order of decreasing preference.
    pub fn resolve(tiers: &[&ProcessingOptions]) -> Self {
        Self {
            timeout_millis: first_non_zero(tiers.iter().map(|t| t.timeout_millis), 0),
            max_headers_size: first_positive(tiers.iter().map(|t| t.max_headers_size), DEFAULT_MAX_HEADERS_SIZE as i64)
                as usize,
            max_response_body_size: first_non_zero(
                tiers.iter().map(|t| t.max_response_body_size),
                DEFAULT_MAX_RESPONSE_BODY_SIZE,
            ),
            response_buffering_enabled: tiers.iter().find_map(|t| t.response_buffering_enabled).unwrap_or(true),
        }
    }
}

fn first_positive(candidates: impl Iterator<Item = Option<i64>>, default: i64) -> i64 {
    candidates.flatten().find(|v| *v > 0).unwrap_or(default)
}

fn first_non_zero(candidates: impl Iterator<Item = Option<i64>>, default: i64) -> i64 {
    candidates.flatten().find(|v| *v != 0).unwrap_or(default)
}
