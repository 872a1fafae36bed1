use std::cmp::Reverse;
use std::collections::HashMap;

use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::normalize::{normalize_name, strip_parenthetical};

/// How a name was mapped to its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Alias,
    Exact,
    Qualifier,
    Approximate,
    None,
}

/// Resolver output: best canonical identity (if any) and a 0-100 score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub identity: Option<String>,
    pub score: f64,
    pub method: MatchMethod,
}

impl Resolution {
    pub fn unresolved() -> Self {
        Self {
            identity: None,
            score: 0.0,
            method: MatchMethod::None,
        }
    }

    fn certain(identity: &str, method: MatchMethod) -> Self {
        Self {
            identity: Some(identity.to_string()),
            score: 100.0,
            method,
        }
    }

    /// The identity, if the score reaches `threshold`.
    pub fn accepted(&self, threshold: f64) -> Option<&str> {
        if self.score >= threshold {
            self.identity.as_deref()
        } else {
            None
        }
    }
}

/// Maps free-text ingredient names to canonical identities.
pub trait IdentityResolver {
    fn resolve(&self, raw_name: &str) -> Resolution;
}

/// Resolver over a fixed catalog of canonical names plus an alias table.
///
/// Order: alias, exact, parenthetical qualifier stripped, then best
/// approximate match by [`similarity_ratio`]. Ties go to the
/// lexicographically first catalog name.
#[derive(Debug, Clone)]
pub struct CatalogResolver {
    names: Vec<String>,
    known: FxHashSet<String>,
    aliases: FxHashMap<String, String>,
}

impl CatalogResolver {
    pub fn new(names: Vec<String>, aliases: HashMap<String, String>) -> Self {
        let mut names: Vec<String> = names.iter().map(|n| normalize_name(n)).collect();
        names.sort_unstable();
        names.dedup();
        let known = names.iter().cloned().collect();
        let aliases = aliases
            .into_iter()
            .map(|(from, to)| (normalize_name(&from), normalize_name(&to)))
            .collect();
        Self { names, known, aliases }
    }

    fn lookup(&self, name: &str) -> Option<(&str, MatchMethod)> {
        if let Some(target) = self.aliases.get(name) {
            return Some((target.as_str(), MatchMethod::Alias));
        }
        self.known
            .get(name)
            .map(|hit| (hit.as_str(), MatchMethod::Exact))
    }

    fn closest(&self, name: &str) -> Option<(&str, f64)> {
        self.names
            .iter()
            .map(|candidate| (candidate.as_str(), similarity_ratio(name, candidate)))
            .max_by_key(|(candidate, score)| (OrderedFloat(*score), Reverse(*candidate)))
    }
}

impl IdentityResolver for CatalogResolver {
    fn resolve(&self, raw_name: &str) -> Resolution {
        let name = normalize_name(raw_name);
        if name.is_empty() {
            return Resolution::unresolved();
        }

        if let Some((identity, method)) = self.lookup(&name) {
            return Resolution::certain(identity, method);
        }

        let stripped = strip_parenthetical(&name);
        if let Some(ref bare) = stripped {
            if let Some((identity, _)) = self.lookup(bare) {
                return Resolution::certain(identity, MatchMethod::Qualifier);
            }
        }

        let mut best = self.closest(&name);
        if let Some(ref bare) = stripped {
            if let Some((identity, score)) = self.closest(bare) {
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((identity, score));
                }
            }
        }

        match best {
            Some((identity, score)) => Resolution {
                identity: Some(identity.to_string()),
                score,
                method: MatchMethod::Approximate,
            },
            None => Resolution::unresolved(),
        }
    }
}

/// Indel similarity on a 0-100 scale: `100 * 2 * lcs / (|a| + |b|)`.
///
/// Two empty strings score 100.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 100.0;
    }

    // Longest common subsequence, two rolling rows.
    let mut prev = vec![0usize; b_chars.len() + 1];
    let mut curr = vec![0usize; b_chars.len() + 1];
    for ac in &a_chars {
        for (j, bc) in b_chars.iter().enumerate() {
            curr[j + 1] = if ac == bc {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b_chars.len()];

    100.0 * (2 * lcs) as f64 / total as f64
}
