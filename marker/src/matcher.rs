//! # Part matcher
//!
//! Assigns submission fragments to question parts. Equal counts are mapped by
//! position. Otherwise every (fragment, part) pair is scored by token overlap
//! and accepted greedily from the best score down, then any parts still
//! unassigned absorb the remaining fragments in encounter order.

use std::cmp::Ordering;
use std::collections::HashSet;
use util::grading::{QuestionPart, SubmissionFragment};

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "to", "of", "in", "on", "for", "with", "by", "from", "that",
    "this", "it", "is", "are", "as", "be", "your", "student", "write", "implement", "print",
];

/// Lower-cased words with ASCII punctuation removed and stop-words dropped.
pub fn tokens(text: &str) -> HashSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// `|fragment ∩ part| / max(1, |part|)`
pub fn similarity(fragment: &HashSet<String>, part: &HashSet<String>) -> f64 {
    fragment.intersection(part).count() as f64 / part.len().max(1) as f64
}

/// Result of matching. Indices are positions in the slices given to
/// [`PartMatcher::assign`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    /// `by_part[p]` is the fragment assigned to part `p`, if any.
    pub by_part: Vec<Option<usize>>,
    /// Fragments left without a part.
    pub orphans: Vec<usize>,
}

impl Assignment {
    pub fn fragment_for(&self, part: usize) -> Option<usize> {
        self.by_part.get(part).copied().flatten()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PartMatcher {
    threshold: f64,
}

impl Default for PartMatcher {
    fn default() -> Self {
        Self { threshold: 0.05 }
    }
}

impl PartMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn assign(&self, parts: &[QuestionPart], fragments: &[SubmissionFragment]) -> Assignment {
        if parts.len() == fragments.len() {
            return Assignment {
                by_part: (0..parts.len()).map(Some).collect(),
                orphans: Vec::new(),
            };
        }

        let part_tokens: Vec<_> = parts.iter().map(|p| tokens(&p.text)).collect();
        let mut triples: Vec<(f64, usize, usize)> = Vec::with_capacity(parts.len() * fragments.len());
        for (f, fragment) in fragments.iter().enumerate() {
            let ft = tokens(&fragment.text);
            for (p, pt) in part_tokens.iter().enumerate() {
                triples.push((similarity(&ft, pt), f, p));
            }
        }
        // Stable: equal scores keep fragment-major, part-minor order.
        triples.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let mut by_part: Vec<Option<usize>> = vec![None; parts.len()];
        let mut taken = vec![false; fragments.len()];

        for (score, f, p) in triples {
            if score < self.threshold {
                break;
            }
            if by_part[p].is_none() && !taken[f] {
                by_part[p] = Some(f);
                taken[f] = true;
            }
        }

        let mut free = (0..fragments.len()).filter(|f| !taken[*f]).collect::<Vec<_>>().into_iter();
        for slot in by_part.iter_mut().filter(|s| s.is_none()) {
            match free.next() {
                Some(f) => {
                    *slot = Some(f);
                    taken[f] = true;
                }
                None => break,
            }
        }

        let orphans = (0..fragments.len()).filter(|f| !taken[*f]).collect();
        Assignment { by_part, orphans }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(texts: &[&str]) -> Vec<QuestionPart> {
        texts
            .iter()
            .enumerate()
            .map(|(index, t)| QuestionPart {
                index,
                text: t.to_string(),
            })
            .collect()
    }

    fn frags(texts: &[&str]) -> Vec<SubmissionFragment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| SubmissionFragment::new(i, *t))
            .collect()
    }

    #[test]
    fn tokens_drop_punctuation_and_stopwords() {
        let t = tokens("Write a function: reverse(the) STRING!");
        let mut v: Vec<_> = t.into_iter().collect();
        v.sort();
        assert_eq!(v, vec!["function", "reverse", "string"]);
    }

    #[test]
    fn equal_counts_map_by_position() {
        let a = PartMatcher::default().assign(
            &parts(&["sum numbers", "reverse string"]),
            &frags(&["s = input()[::-1]", "a + b"]),
        );
        assert_eq!(a.by_part, vec![Some(0), Some(1)]);
        assert!(a.orphans.is_empty());
    }

    #[test]
    fn greedy_assignment_by_overlap() {
        let a = PartMatcher::default().assign(
            &parts(&["sum two numbers", "reverse a string", "factorial of n"]),
            &frags(&["def factorial(n): return n", "def reverse(string): return string[::-1]"]),
        );
        assert_eq!(a.fragment_for(1), Some(1));
        assert_eq!(a.fragment_for(2), Some(0));
        assert_eq!(a.fragment_for(0), None);
    }

    #[test]
    fn leftovers_are_absorbed_in_order() {
        let a = PartMatcher::default().assign(
            &parts(&["alpha", "beta"]),
            &frags(&["zzz", "yyy", "xxx"]),
        );
        assert_eq!(a.by_part, vec![Some(0), Some(1)]);
        assert_eq!(a.orphans, vec![2]);
    }

    #[test]
    fn assignment_is_injective() {
        let a = PartMatcher::default().assign(
            &parts(&["sum numbers", "sum numbers again", "product"]),
            &frags(&["sum numbers", "sum", "numbers", "sum numbers product", "noise"]),
        );
        let assigned: Vec<usize> = a.by_part.iter().flatten().copied().collect();
        let unique: HashSet<usize> = assigned.iter().copied().collect();
        assert_eq!(assigned.len(), unique.len());
        assert_eq!(assigned.len() + a.orphans.len(), 5);
    }

    #[test]
    fn no_fragments_leaves_parts_empty() {
        let a = PartMatcher::default().assign(&parts(&["a", "b"]), &[]);
        assert_eq!(a.by_part, vec![None, None]);
    }
}
