//! Text similarity as a matching-block ratio.
//!
//! The ratio is `2 * M / T`, where `T` is the combined length of both strings
//! and `M` is the total size of the matching blocks found by repeatedly taking
//! the longest common contiguous run and recursing into the unmatched text on
//! either side of it. Lengths are counted in Unicode scalar values.

use std::collections::HashMap;

/// Similarity ratio in `[0, 1]`. Two empty strings are identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_size(&a, &b) as f64 / total as f64
}

/// True when the ratio reaches `threshold`; also returns the ratio.
pub fn texts_match(a: &str, b: &str, threshold: f64) -> (bool, f64) {
    let ratio = similarity_ratio(a, b);
    (ratio >= threshold, ratio)
}

/// Sum of all matching block sizes between `a` and `b`.
fn matching_size(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        b2j.entry(*ch).or_default().push(j);
    }

    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    total
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]`, as `(i, j, size)`.
/// Ties resolve to the earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // j2len[j] = length of the run ending at a[i - 1] and b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts() {
        assert_eq!(similarity_ratio("Policy number 42", "Policy number 42"), 1.0);
        assert_eq!(similarity_ratio("", ""), 1.0);
    }

    #[test]
    fn test_disjoint_texts() {
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_known_ratios() {
        // "abcd" vs "bcde": one block "bcd" of size 3 -> 6/8
        assert!((similarity_ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
        // "abxcd" vs "abcd": blocks "ab" and "cd" -> 8/9
        assert!((similarity_ratio("abxcd", "abcd") - 8.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_order_sensitive() {
        // Same characters, different order: only one char can match in sequence
        let ratio = similarity_ratio("ab", "ba");
        assert!((ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_character_change() {
        let a = "The insured amount is 1000 dollars.";
        let b = "The insured amount is 1900 dollars.";
        let ratio = similarity_ratio(a, b);
        assert!(ratio > 0.95 && ratio < 1.0);
    }

    #[test]
    fn test_unicode_counts_scalars() {
        // One differing scalar out of 4 on each side -> 6/8
        assert!((similarity_ratio("čaša", "čašo") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_texts_match_threshold() {
        let (ok, ratio) = texts_match("abcd", "bcde", 0.75);
        assert!(ok);
        assert!((ratio - 0.75).abs() < 1e-12);
        let (ok, _) = texts_match("abcd", "bcde", 0.76);
        assert!(!ok);
    }
}
