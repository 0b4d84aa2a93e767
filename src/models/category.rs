/// Canonical eligibility category codes stored on incentives.
pub const VETERAN: &str = "veteran";
pub const ACTIVE_DUTY: &str = "active-duty";
pub const FIRST_RESPONDER: &str = "first-responder";
pub const SPOUSE: &str = "spouse";
pub const OTHER: &str = "other";
pub const NOT_AVAILABLE: &str = "not-available";

/// Maps the category spellings accepted at the API boundary to their
/// canonical codes. Legacy clients send abbreviated forms ("VT", "AD");
/// normalization happens here, once, and nowhere else.
const ALIASES: &[(&str, &str)] = &[
    ("veteran", VETERAN),
    ("vt", VETERAN),
    ("vet", VETERAN),
    ("active-duty", ACTIVE_DUTY),
    ("active_duty", ACTIVE_DUTY),
    ("ad", ACTIVE_DUTY),
    ("first-responder", FIRST_RESPONDER),
    ("first_responder", FIRST_RESPONDER),
    ("fr", FIRST_RESPONDER),
    ("spouse", SPOUSE),
    ("sp", SPOUSE),
    ("other", OTHER),
    ("ot", OTHER),
    ("not-available", NOT_AVAILABLE),
    ("na", NOT_AVAILABLE),
];

/// Resolves one submitted category code to its canonical form.
pub fn canonicalize(code: &str) -> Option<&'static str> {
    let normalized = code.trim().to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| *canonical)
}

/// Normalizes a submitted category list and enforces the invariants:
/// at least one code, no unknown codes, no duplicates, and
/// "not-available" only ever appears alone.
pub fn normalize_categories(codes: &[String]) -> Result<Vec<String>, String> {
    if codes.is_empty() {
        return Err("At least one eligibility category is required".to_string());
    }

    let mut canonical = Vec::with_capacity(codes.len());
    for code in codes {
        let resolved = canonicalize(code)
            .ok_or_else(|| format!("Unknown eligibility category: {}", code))?;
        if !canonical.contains(&resolved.to_string()) {
            canonical.push(resolved.to_string());
        }
    }

    if canonical.iter().any(|c| c == NOT_AVAILABLE) && canonical.len() > 1 {
        return Err(
            "Category 'not-available' cannot be combined with other categories".to_string(),
        );
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_aliases() {
        assert_eq!(canonicalize("VT"), Some(VETERAN));
        assert_eq!(canonicalize("active_duty"), Some(ACTIVE_DUTY));
        assert_eq!(canonicalize(" fr "), Some(FIRST_RESPONDER));
        assert_eq!(canonicalize("unknown"), None);
    }

    #[test]
    fn test_normalize_deduplicates() {
        let codes = vec!["vet".to_string(), "veteran".to_string(), "sp".to_string()];
        let normalized = normalize_categories(&codes).unwrap();
        assert_eq!(normalized, vec![VETERAN, SPOUSE]);
    }

    #[test]
    fn test_not_available_is_exclusive() {
        let codes = vec!["na".to_string(), "veteran".to_string()];
        assert!(normalize_categories(&codes).is_err());

        let alone = vec!["na".to_string()];
        assert_eq!(normalize_categories(&alone).unwrap(), vec![NOT_AVAILABLE]);
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(normalize_categories(&[]).is_err());
    }
}
