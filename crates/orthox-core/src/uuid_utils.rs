//! Identifier helpers.
//!
//! Case, note and media ids are UUIDv7 so they sort by creation time.
//! Patient references are UUIDv4: a pseudonym must not reveal when the
//! patient was first seen.

use uuid::Uuid;

use crate::defaults::{PATIENT_LABEL_LEN, PATIENT_LABEL_PREFIX};

/// Generate a new time-ordered UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a random pseudonymous patient reference.
pub fn new_patient_reference() -> String {
    Uuid::new_v4().to_string()
}

/// Anonymised display label derived from a patient reference.
///
/// ```
/// use orthox_core::uuid_utils::patient_label;
///
/// assert_eq!(patient_label("3f2a9c1e-aaaa-4bbb-8ccc-000000000000"), "Patient_3f2a9c1e");
/// ```
pub fn patient_label(reference_id: &str) -> String {
    let short: String = reference_id.chars().take(PATIENT_LABEL_LEN).collect();
    format!("{}{}", PATIENT_LABEL_PREFIX, short)
}

/// Whether a UUID is version 7.
pub fn is_v7(id: &Uuid) -> bool {
    id.get_version_num() == 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_v7_is_v7_and_ordered() {
        let a = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = new_v7();
        assert!(is_v7(&a));
        assert!(a < b);
    }

    #[test]
    fn test_patient_reference_is_v4() {
        let reference = new_patient_reference();
        let parsed = Uuid::parse_str(&reference).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_patient_label_short_reference() {
        assert_eq!(patient_label("p-001"), "Patient_p-001");
    }

    #[test]
    fn test_patient_label_truncates_to_eight_chars() {
        assert_eq!(patient_label("abcdefghijkl"), "Patient_abcdefgh");
    }
}
