//! Round-search-cache key derivation (§4.5, Open Question (i)): "what makes
//! two manual searches the same search". Resolved as a sorted, lowercased,
//! comma-joined hash of the event-type allowlist — order and case of the
//! caller's allowlist must never affect cache hits.

use crate::model::EventType;

/// Deterministic fingerprint for a `(round_id, allowlist)` cache key.
/// Two allowlists that contain the same event types, in any order or case,
/// produce the same fingerprint.
pub fn allowlist_fingerprint(allowlist: &[EventType]) -> String {
    let mut tags: Vec<&'static str> = allowlist.iter().map(EventType::tag).collect();
    tags.sort_unstable();
    tags.dedup();
    tags.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType::*;

    #[test]
    fn order_does_not_affect_fingerprint() {
        let a = allowlist_fingerprint(&[Race, Qualifying, FP1]);
        let b = allowlist_fingerprint(&[FP1, Race, Qualifying]);
        assert_eq!(a, b);
    }

    #[test]
    fn duplicates_collapse() {
        let a = allowlist_fingerprint(&[Race, Race, Qualifying]);
        let b = allowlist_fingerprint(&[Race, Qualifying]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_allowlists_differ() {
        let a = allowlist_fingerprint(&[Race]);
        let b = allowlist_fingerprint(&[Race, Qualifying]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_allowlist_is_empty_string() {
        assert_eq!(allowlist_fingerprint(&[]), "");
    }
}
