//! Units of measure.
//!
//! The catalog carries a fixed standard set rather than a per-tenant UOM
//! directory. Membership checks are case-insensitive.

/// Default unit applied when a value arrives blank.
pub const DEFAULT_UOM: &str = "Nos";

/// Standard unit set consulted by catalog matching.
pub const STANDARD_UOMS: &[&str] = &[
    "Nos", "Unit", "Box", "Kg", "Gram", "Litre", "Meter", "Pair", "Set", "Hour",
];

/// Unit actually in effect for a value: the trimmed raw value, or
/// [`DEFAULT_UOM`] when blank.
pub fn effective_uom(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_UOM
    } else {
        trimmed
    }
}

/// Case-insensitive membership in [`STANDARD_UOMS`].
pub fn is_standard_uom(uom: &str) -> bool {
    let uom = uom.trim();
    STANDARD_UOMS.iter().any(|s| s.eq_ignore_ascii_case(uom))
}
