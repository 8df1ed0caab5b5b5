// src/core/fuzzy.rs

//! Approximate matching of an unknown command name against the registry.
//!
//! Scores are in `[0, 100]`. The plain ratio is derived from the insertion/deletion edit
//! distance (`100 * (1 - indel / (len_a + len_b))`). A token-set ratio handles reordered or
//! partial words and is scaled down slightly so that it never outranks an exact match.

use crate::constants::FUZZY_THRESHOLD;
use std::collections::BTreeSet;

/// Weight applied to the token-set ratio, in percent.
const TOKEN_SET_WEIGHT: u32 = 95;

/// The closest registry name to a candidate and how close it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub name: String,
    pub score: u8,
}

/// Returns the best-scoring name, or `None` if `names` is empty.
///
/// Ties are broken by the higher plain ratio, then by the lexicographically smallest name,
/// so the same inputs always yield the same match regardless of iteration order.
pub fn best_match<'a>(
    candidate: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Option<FuzzyMatch> {
    let candidate_norm = normalize(candidate);

    names
        .into_iter()
        .map(|name| {
            let name_norm = normalize(name);
            let plain = ratio(&candidate_norm, &name_norm);
            let score = plain.max(weighted_token_set(&candidate_norm, &name_norm));
            (score, plain, name)
        })
        .min_by(|(sa, pa, na), (sb, pb, nb)| sb.cmp(sa).then(pb.cmp(pa)).then(na.cmp(nb)))
        .map(|(score, _, name)| FuzzyMatch {
            name: name.to_string(),
            score,
        })
}

/// Returns the best match only if it is confident enough to propose to the operator.
pub fn propose<'a>(candidate: &str, names: impl IntoIterator<Item = &'a str>) -> Option<FuzzyMatch> {
    best_match(candidate, names).filter(|m| m.score > FUZZY_THRESHOLD)
}

/// Similarity of two raw strings.
pub fn similarity(a: &str, b: &str) -> u8 {
    let (a, b) = (normalize(a), normalize(b));
    ratio(&a, &b).max(weighted_token_set(&a, &b))
}

/// Lowercases and turns every non-alphanumeric run into a single space.
fn normalize(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Indel-distance ratio of two already normalized strings.
fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    let common = lcs_len(&a_chars, &b_chars);
    percent(2 * common, total)
}

fn weighted_token_set(a: &str, b: &str) -> u8 {
    let raw = u32::from(token_set_ratio(a, b));
    let weighted = (raw * TOKEN_SET_WEIGHT + 50) / 100;
    u8::try_from(weighted).unwrap_or(100)
}

/// Compares the shared words of both strings against each side's full word set.
fn token_set_ratio(a: &str, b: &str) -> u8 {
    let a_tokens: BTreeSet<&str> = a.split(' ').filter(|t| !t.is_empty()).collect();
    let b_tokens: BTreeSet<&str> = b.split(' ').filter(|t| !t.is_empty()).collect();
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0;
    }

    let join = |tokens: Vec<&str>| tokens.join(" ");
    let shared = join(a_tokens.intersection(&b_tokens).copied().collect());
    let only_a = join(a_tokens.difference(&b_tokens).copied().collect());
    let only_b = join(b_tokens.difference(&a_tokens).copied().collect());

    let with_a = format!("{} {}", shared, only_a).trim().to_string();
    let with_b = format!("{} {}", shared, only_b).trim().to_string();

    ratio(&shared, &with_a)
        .max(ratio(&shared, &with_b))
        .max(ratio(&with_a, &with_b))
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    for ca in a {
        let mut curr = Vec::with_capacity(b.len() + 1);
        curr.push(0usize);
        for (j, cb) in b.iter().enumerate() {
            let value = if ca == cb {
                prev.get(j).copied().unwrap_or(0) + 1
            } else {
                let up = prev.get(j + 1).copied().unwrap_or(0);
                let left = curr.last().copied().unwrap_or(0);
                up.max(left)
            };
            curr.push(value);
        }
        prev = curr;
    }
    prev.last().copied().unwrap_or(0)
}

/// Rounded `100 * part / whole`, clamped to `[0, 100]`.
fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let value = (part * 100 + whole / 2) / whole;
    u8::try_from(value.min(100)).unwrap_or(100)
}
