use std::collections::HashMap;

use super::{has_text, VenueCandidate};

/// Address keywords required by the strict policy.
const LOCALE_KEYWORDS: &[&str] = &[
    "市", "區", "路", "街", "巷", "號", "台北", "新北", "台中", "台南", "高雄",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// A usable name is enough.
    #[default]
    NameOnly,
    /// Name plus an address containing a locale keyword.
    Strict,
}

impl ValidationPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name-only" | "name_only" | "name" => Some(ValidationPolicy::NameOnly),
            "strict" => Some(ValidationPolicy::Strict),
            _ => None,
        }
    }

    pub fn accepts(&self, candidate: &VenueCandidate) -> bool {
        if !is_valid(candidate) {
            return false;
        }
        match self {
            ValidationPolicy::NameOnly => true,
            ValidationPolicy::Strict => {
                has_text(&candidate.address)
                    && LOCALE_KEYWORDS
                        .iter()
                        .any(|keyword| candidate.address.contains(keyword))
            }
        }
    }

    /// Keeps accepted candidates in their original order.
    pub fn filter(&self, candidates: Vec<VenueCandidate>) -> Vec<VenueCandidate> {
        candidates
            .into_iter()
            .filter(|candidate| self.accepts(candidate))
            .collect()
    }
}

pub fn is_valid(candidate: &VenueCandidate) -> bool {
    has_text(&candidate.name)
}

pub fn filter_valid(candidates: Vec<VenueCandidate>) -> Vec<VenueCandidate> {
    ValidationPolicy::NameOnly.filter(candidates)
}

fn dedup_key(candidate: &VenueCandidate) -> (String, String) {
    let fold = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    (fold(&candidate.name), fold(candidate.display_address()))
}

/// Drops repeats of an earlier candidate with the same name and address.
/// A dropped repeat that carries a handle lends it to the kept one.
pub fn dedup_candidates(candidates: Vec<VenueCandidate>) -> Vec<VenueCandidate> {
    let mut kept: Vec<VenueCandidate> = Vec::with_capacity(candidates.len());
    let mut seen: HashMap<(String, String), usize> = HashMap::new();

    for candidate in candidates {
        let key = dedup_key(&candidate);
        match seen.get(&key) {
            Some(&index) => {
                let first = &mut kept[index];
                if first.handle().is_none() && candidate.handle().is_some() {
                    first.original_handle = candidate.original_handle;
                }
            }
            None => {
                seen.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}
