use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data_handling::FeatureId;

/// A selected feature subset in canonical (sorted, de-duplicated) form.
///
/// Two states holding the same features compare and hash equal regardless of
/// the order they were built from, so they share one entry in the result table.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct State(Vec<FeatureId>);

impl State {
    pub fn new<I: IntoIterator<Item = FeatureId>>(features: I) -> Self {
        let mut features: Vec<FeatureId> = features.into_iter().collect();
        features.sort();
        features.dedup();
        State(features)
    }

    pub fn empty() -> Self {
        State(Vec::new())
    }

    pub fn from_indices(indices: &[usize]) -> Self {
        State::new(indices.iter().copied().map(FeatureId::Index))
    }

    pub fn from_labels(labels: &[&str]) -> Self {
        State::new(labels.iter().map(|&l| FeatureId::from(l)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.0.binary_search(id).is_ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[FeatureId] {
        &self.0
    }

    pub fn contains_all(&self, fixed: &BTreeSet<FeatureId>) -> bool {
        fixed.iter().all(|f| self.contains(f))
    }

    /// This state plus `id`.
    pub fn with(&self, id: &FeatureId) -> State {
        State::new(self.0.iter().cloned().chain(std::iter::once(id.clone())))
    }

    /// This state minus `id`.
    pub fn without(&self, id: &FeatureId) -> State {
        State(self.0.iter().filter(|f| *f != id).cloned().collect())
    }
}

impl FromIterator<FeatureId> for State {
    fn from_iter<I: IntoIterator<Item = FeatureId>>(iter: I) -> Self {
        State::new(iter)
    }
}

impl<'a> IntoIterator for &'a State {
    type Item = &'a FeatureId;
    type IntoIter = std::slice::Iter<'a, FeatureId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        if parts.len() == 1 {
            write!(f, "({},)", parts[0])
        } else {
            write!(f, "({})", parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        let a = State::from_indices(&[3, 1, 2, 1]);
        let b = State::from_indices(&[1, 2, 3]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "(1, 2, 3)");
        assert_eq!(State::from_indices(&[4]).to_string(), "(4,)");
    }

    #[test]
    fn test_with_and_without() {
        let s = State::from_indices(&[0, 2]);
        assert_eq!(s.with(&FeatureId::Index(1)), State::from_indices(&[0, 1, 2]));
        assert_eq!(s.without(&FeatureId::Index(2)), State::from_indices(&[0]));
        let fixed: BTreeSet<FeatureId> = [FeatureId::Index(2)].into_iter().collect();
        assert!(s.contains_all(&fixed));
        assert!(!s.without(&FeatureId::Index(2)).contains_all(&fixed));
    }
}
