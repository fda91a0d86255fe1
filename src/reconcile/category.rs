//! Out-of-office detection on reply categories.

/// Category substrings that mark a reply as an auto-responder, not a human.
const OOO_MARKERS: [&str; 2] = ["out of office", "ooo"];

/// Classify a reply category as out-of-office. Anything else, including an
/// absent category, is a real reply. This is a two-way split, not a general
/// taxonomy: only the real-replies subset consults it, total replies count
/// every deduplicated identity regardless of category.
pub fn is_out_of_office(category: Option<&str>) -> bool {
    let Some(raw) = category else {
        return false;
    };
    let lowered = raw.to_lowercase();
    OOO_MARKERS.iter().any(|marker| lowered.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitively() {
        assert!(is_out_of_office(Some("Out of Office")));
        assert!(is_out_of_office(Some("OUT OF OFFICE - back Monday")));
        assert!(is_out_of_office(Some("OOO")));
        assert!(is_out_of_office(Some("ooo until friday")));
    }

    #[test]
    fn everything_else_is_real() {
        assert!(!is_out_of_office(Some("Interested")));
        assert!(!is_out_of_office(Some("Not interested")));
        assert!(!is_out_of_office(Some("")));
        assert!(!is_out_of_office(None));
    }
}
