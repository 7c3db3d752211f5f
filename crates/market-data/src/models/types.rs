/// Coin identifier as understood by the upstream (e.g. "bitcoin").
pub type Coin = String;

/// Quote currency identifier (e.g. "usd").
pub type CurrencyCode = String;

/// Canonical form of a coin or currency identifier.
///
/// Identifiers compare case-insensitively, so every id entering the system
/// is trimmed and lowercased once at the boundary.
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_id_trims_and_lowercases() {
        assert_eq!(normalize_id("  Bitcoin "), "bitcoin");
        assert_eq!(normalize_id("USD"), "usd");
        assert_eq!(normalize_id("   "), "");
    }
}
