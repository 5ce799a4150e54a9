//! Lookup-key normalization.

/// Normalizes a user name, email or role name into its lookup form.
///
/// Uppercasing follows Unicode case mapping, so `"straße"` becomes `"STRASSE"`.
pub fn normalize_key(value: &str) -> String {
    value.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_uppercases() {
        assert_eq!(normalize_key("Alice"), "ALICE");
        assert_eq!(normalize_key("alice@Example.com"), "ALICE@EXAMPLE.COM");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_key("Bob.Smith");
        assert_eq!(normalize_key(&once), once);
    }
}
