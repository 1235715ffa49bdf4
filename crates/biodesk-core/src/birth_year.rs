//! Birth-year derivation for the biodata secondary index.
//!
//! The record store indexes biodata by `birth_year`, which is never supplied
//! by callers. It is recomputed from the dynamic field list on every create
//! and on every update that changes the list.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::BioField;

/// Label fragments (lower-cased) that mark a date-of-birth field.
pub const DOB_LABEL_MARKERS: &[&str] = &["date of birth", "dob"];

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

/// True if the label names a date-of-birth field.
pub fn is_dob_label(label: &str) -> bool {
    let label = label.to_lowercase();
    DOB_LABEL_MARKERS.iter().any(|m| label.contains(m))
}

/// Derive the birth year from an ordered field list.
///
/// Only the first field with a date-of-birth label is considered. Returns the
/// first standalone 19xx/20xx token in its value, or `None`.
pub fn derive_birth_year(fields: &[BioField]) -> Option<i32> {
    let dob = fields.iter().find(|f| is_dob_label(&f.label))?;
    YEAR_PATTERN
        .find(&dob.value)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<BioField> {
        pairs.iter().map(|(l, v)| BioField::new(*l, *v)).collect()
    }

    #[test]
    fn test_date_of_birth_label() {
        let f = fields(&[("Name", "Asha"), ("Date of Birth", "14 March 1994")]);
        assert_eq!(derive_birth_year(&f), Some(1994));
    }

    #[test]
    fn test_no_dob_label() {
        let f = fields(&[("Name", "Asha"), ("Height", "5'4\""), ("Born", "1994")]);
        assert_eq!(derive_birth_year(&f), None);
    }

    #[test]
    fn test_two_digit_year_is_not_a_year() {
        let f = fields(&[("DOB", "March 94")]);
        assert_eq!(derive_birth_year(&f), None);
    }

    #[test]
    fn test_label_match_is_case_insensitive_substring() {
        assert_eq!(derive_birth_year(&fields(&[("Candidate dob", "2001-02-03")])), Some(2001));
        assert_eq!(derive_birth_year(&fields(&[("DATE OF BIRTH:", "03/02/1988")])), Some(1988));
    }

    #[test]
    fn test_first_matching_field_wins() {
        let f = fields(&[("DOB", "1990"), ("Date of birth", "1994")]);
        assert_eq!(derive_birth_year(&f), Some(1990));
    }

    #[test]
    fn test_first_dob_field_without_year_does_not_fall_through() {
        let f = fields(&[("DOB", "unknown"), ("Date of birth", "1994")]);
        assert_eq!(derive_birth_year(&f), None);
    }

    #[test]
    fn test_out_of_range_centuries_ignored() {
        assert_eq!(derive_birth_year(&fields(&[("DOB", "1 Jan 1899")])), None);
        assert_eq!(derive_birth_year(&fields(&[("DOB", "ref 219945")])), None);
    }

    #[test]
    fn test_first_year_token_in_value() {
        let f = fields(&[("DOB", "1992 (registered 2001)")]);
        assert_eq!(derive_birth_year(&f), Some(1992));
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(derive_birth_year(&[]), None);
    }
}
