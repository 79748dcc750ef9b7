//! Phone number normalization for the telephony bridge
//!
//! The bridge addresses extensions by the last five digits of a number, so
//! directory numbers like "555-1234" become "51234".

/// Map a raw directory phone number to the bridge's suffix form.
///
/// Numbers shorter than five characters pass through unchanged; everything
/// else has hyphens stripped and keeps only the last five characters. This
/// is purely structural, with no validation that the result is numeric.
pub fn normalize(raw: &str) -> String {
    if raw.chars().count() < 5 {
        return raw.to_string();
    }

    let stripped: Vec<char> = raw.chars().filter(|&c| c != '-').collect();
    if stripped.len() <= 5 {
        stripped.into_iter().collect()
    } else {
        stripped[stripped.len() - 5..].iter().collect()
    }
}
