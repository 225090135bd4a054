//! Hazardous goods (ADR) class compatibility.
//!
//! The validator only needs to know whether two classes may travel next to
//! each other. The table is injected through `ValidationConfig`, so callers
//! can extend it without touching the rule code.

use std::collections::BTreeSet;

/// Symmetric set of incompatible hazard class pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HazardMatrix {
    pairs: BTreeSet<(String, String)>,
}

impl HazardMatrix {
    /// A matrix without any incompatibilities.
    pub fn empty() -> Self {
        Self {
            pairs: BTreeSet::new(),
        }
    }

    /// Builds a matrix from class pairs; pair order is irrelevant.
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut matrix = Self::empty();
        for (a, b) in pairs {
            matrix.insert(a, b);
        }
        matrix
    }

    /// Marks two classes as incompatible.
    pub fn insert(&mut self, a: impl Into<String>, b: impl Into<String>) {
        self.pairs.insert(Self::key(&a.into(), &b.into()));
    }

    /// Whether the two classes must not be loaded next to each other.
    pub fn is_incompatible(&self, a: &str, b: &str) -> bool {
        self.pairs.contains(&Self::key(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parses a list such as `"3:8, 1:5.1"`.
    ///
    /// # Returns
    /// `Err` with the offending entry if a pair is malformed
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut matrix = Self::empty();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once(':') {
                Some((a, b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
                    matrix.insert(a, b);
                }
                _ => return Err(entry.to_string()),
            }
        }
        Ok(matrix)
    }

    /// Trimmed, ordered pair used as the set key.
    fn key(a: &str, b: &str) -> (String, String) {
        let (a, b) = (a.trim(), b.trim());
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        (low.to_string(), high.to_string())
    }
}

impl Default for HazardMatrix {
    /// Flammable liquids (class 3) and corrosives (class 8).
    fn default() -> Self {
        Self::from_pairs([("3", "8")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matrix_blocks_three_and_eight_both_ways() {
        let matrix = HazardMatrix::default();
        assert!(matrix.is_incompatible("3", "8"));
        assert!(matrix.is_incompatible("8", "3"));
        assert!(!matrix.is_incompatible("3", "3"));
        assert!(!matrix.is_incompatible("2", "8"));
        assert!(matrix.is_incompatible(" 8 ", "3"));
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn parse_accepts_lists_and_whitespace() {
        let matrix = HazardMatrix::parse(" 3:8 , 1:5.1,").unwrap();
        assert_eq!(matrix.len(), 2);
        assert!(matrix.is_incompatible("5.1", "1"));
        // Stored without the surrounding whitespace
        assert!(matrix.is_incompatible("1", "5.1"));

        let mut inserted = HazardMatrix::empty();
        inserted.insert(" 2 ", "4.1");
        inserted.insert("4.1", "2");
        assert_eq!(inserted.len(), 1);
        assert!(HazardMatrix::parse("").unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_malformed_entries() {
        assert_eq!(HazardMatrix::parse("3:8,38"), Err("38".to_string()));
        assert_eq!(HazardMatrix::parse("3:"), Err("3:".to_string()));
    }
}
