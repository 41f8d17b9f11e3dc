//! Encoding between the abstract metric/tag model and InfluxDB's flat
//! namespace of measurement names and string tag keys/values.
//!
//! Three concerns live here, and only here:
//!
//! - **Metric keys** become measurement names. Characters that would break
//!   Flux query-string interpolation are stripped.
//! - **Tag values** are percent-encoded so a colon — which conflicts with
//!   Flux filter syntax — round-trips losslessly, even for values that
//!   contain the placeholder sequence itself.
//! - **Tag keys** are prefixed with their classification so intrinsic and
//!   meta tags with the same raw key stay distinguishable, and so adapter
//!   tags can never collide with InfluxDB's reserved `_`-prefixed columns.
//!
//! Encoding is total: every input yields some backend-safe string. Decoding
//! a value can detect irreversible input; see [`checked_decode_tag_value`].

/// Classification of a tag key: part of the metric's identity, or
/// auxiliary metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    /// Identity-bearing tag.
    Intrinsic,
    /// Auxiliary/descriptive tag.
    Meta,
}

impl TagClass {
    /// The classified-key prefix for this class, separator included.
    ///
    /// Neither prefix is a prefix of the other, so classification is
    /// injective over (class, key) pairs.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            TagClass::Intrinsic => "intrinsic_",
            TagClass::Meta => "meta_",
        }
    }
}

/// Encodes a metric key as an InfluxDB measurement name.
///
/// Strips double quotes and backslashes — the characters that would break
/// out of the interpolated string literal in a Flux query. Stable: the same
/// input always yields the same output. Distinct keys stay distinct unless
/// they differ only in stripped characters.
#[must_use]
pub fn encode_metric_key(key: &str) -> String {
    key.chars().filter(|c| *c != '"' && *c != '\\').collect()
}

/// Encodes a tag value for storage in InfluxDB.
///
/// A colon in a tag value breaks Flux tag filtering, so it is replaced by
/// the placeholder `%3A`. To keep the scheme reversible for values that
/// already contain a placeholder, `%` itself is encoded first as `%25`.
///
/// `decode_tag_value(encode_tag_value(v)) == v` holds for every `v`.
#[must_use]
pub fn encode_tag_value(value: &str) -> String {
    value.replace('%', "%25").replace(':', "%3A")
}

/// Decodes a tag value read back from InfluxDB.
///
/// Inverse of [`encode_tag_value`]. Lenient: a value that was not produced
/// by the encoder (and therefore cannot be decoded reversibly) is returned
/// unchanged rather than failing — one malformed tag must not invalidate
/// the whole metric it belongs to.
#[must_use]
pub fn decode_tag_value(value: &str) -> String {
    checked_decode_tag_value(value).unwrap_or_else(|| value.to_owned())
}

/// Decodes a tag value, reporting irreversible input.
///
/// Returns `None` when the input is not a valid encoder output — that is,
/// when re-encoding the decoded form would not reproduce the input. Callers
/// that need to distinguish "decoded" from "passed through" (the catalog
/// load does) use this; everyone else uses [`decode_tag_value`].
#[must_use]
pub fn checked_decode_tag_value(value: &str) -> Option<String> {
    // Order matters: every '%' in a valid encoding is the start of "%25",
    // so "%3A" can only occur where a colon was encoded.
    let decoded = value.replace("%3A", ":").replace("%25", "%");
    if encode_tag_value(&decoded) == value {
        Some(decoded)
    } else {
        None
    }
}

/// Builds the backend-level tag key for a classified tag.
///
/// Concatenates the class prefix and the raw key: `intrinsic_` + `host`
/// becomes `intrinsic_host`. Classified keys never collide with InfluxDB's
/// reserved columns (`_measurement`, `_time`, `_field`, ...), which all
/// start with an underscore.
#[must_use]
pub fn classify_tag_key(class: TagClass, key: &str) -> String {
    format!("{}{}", class.prefix(), key)
}

/// Splits a backend column name into its classification and raw tag key.
///
/// Returns `None` when the name carries no recognized class prefix —
/// meaning it is an InfluxDB-internal column rather than an adapter-owned
/// tag. This is a signal, not an error.
#[must_use]
pub fn unclassify_tag_key(classified: &str) -> Option<(TagClass, &str)> {
    for class in [TagClass::Intrinsic, TagClass::Meta] {
        if let Some(raw) = classified.strip_prefix(class.prefix()) {
            return Some((class, raw));
        }
    }
    None
}
