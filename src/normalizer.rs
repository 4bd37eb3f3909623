// 🔤 Identifier Normalizer
// Canonical form for CNPJ-like identifiers: letters and digits only, upper case.
//
//   "11.222.333/0001-44" → "11222333000144"
//   "ab-12 c"            → "AB12C"

/// Normalize a raw identifier into its comparable form.
///
/// Total and idempotent: any input (including `""`) yields a string, and
/// `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Same as [`normalize`], treating an absent identifier as empty.
pub fn normalize_opt(raw: Option<&str>) -> String {
    raw.map(normalize).unwrap_or_default()
}

/// Two identifiers match when their canonical forms are equal AND non-empty.
///
/// Two blank identifiers are not evidence of a match.
pub fn identifiers_match(a: Option<&str>, b: Option<&str>) -> bool {
    let left = normalize_opt(a);
    if left.is_empty() {
        return false;
    }
    left == normalize_opt(b)
}

// ============================================================================
// TESTS
// ============================================================================
