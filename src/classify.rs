//! Person vs facility classification of raw BI strings.

use crate::normalize::vocab::{FACILITY_SUFFIX_RE, SERVICE_RE, WORD_RE};

/// Decide whether a raw name denotes a facility/service rather than a person.
///
/// Rule order matters and is part of the contract:
/// 1. any service word anywhere -> facility
/// 2. facility-type suffix at the end -> facility
/// 3. short "Dr. X" with no service word -> person
/// 4. default -> person
///
/// Rule 3 is only reachable for strings rule 1 already passed over, which
/// makes it equivalent to the default; it is kept because review data was
/// produced against this exact precedence.
pub fn is_facility(name: &str) -> bool {
    let n = name.to_lowercase();
    let n = n.trim();
    if n.is_empty() {
        return false;
    }

    if SERVICE_RE.is_match(n) {
        return true;
    }

    if FACILITY_SUFFIX_RE.is_match(n) {
        return true;
    }

    if n.starts_with("dr ") || n.starts_with("dr.") || n.starts_with("doctor ") {
        let token_count = WORD_RE.find_iter(n).count();
        if token_count <= 3 && !SERVICE_RE.is_match(n) {
            return false;
        }
    }

    false
}
