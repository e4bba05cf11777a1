//! Grade ladders
//!
//! Provides [`GradeLadder`], the immutable ordered hierarchy of grades with
//! one designated base (anchor) grade. Every scenario is derived against a
//! ladder, and scenarios can only be compared when their ladders are equal.

use crate::grade::{Grade, GradeId, GradeIdError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered grade hierarchy with a base grade
///
/// Rank 0 is the highest-paid grade, the last rank the lowest. The base grade
/// may sit anywhere in the order. Construction validates the ladder once;
/// afterwards it is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LadderSpec", into = "LadderSpec")]
pub struct GradeLadder {
    grades: Vec<GradeId>,
    base: usize,
}

/// Wire form of a ladder: ordered ids plus the base id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderSpec {
    /// Grade ids, highest paid first
    pub grades: Vec<GradeId>,
    /// Base grade id
    pub base: GradeId,
}

impl GradeLadder {
    /// Create a ladder from ordered ids and a base id
    ///
    /// # Errors
    /// - `LadderError::Empty` if no grades are given
    /// - `LadderError::DuplicateGrade` if an id appears twice
    /// - `LadderError::BaseNotFound` if the base id is not in the list
    pub fn new(grades: Vec<GradeId>, base: &GradeId) -> Result<Self, LadderError> {
        if grades.is_empty() {
            return Err(LadderError::Empty);
        }

        let mut seen = HashSet::with_capacity(grades.len());
        for id in &grades {
            if !seen.insert(id) {
                return Err(LadderError::DuplicateGrade(id.clone()));
            }
        }

        let base = grades
            .iter()
            .position(|g| g == base)
            .ok_or_else(|| LadderError::BaseNotFound(base.clone()))?;

        Ok(Self { grades, base })
    }

    /// Create a ladder from raw names
    ///
    /// # Errors
    /// Returns error if any name is not a valid grade id, or per [`GradeLadder::new`]
    pub fn from_names<I, S>(names: I, base: &str) -> Result<Self, LadderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let grades = names
            .into_iter()
            .map(GradeId::new)
            .collect::<Result<Vec<_>, _>>()?;
        let base = GradeId::new(base)?;
        Self::new(grades, &base)
    }

    /// Number of grades
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.grades.len()
    }

    /// Always false: a ladder holds at least its base grade
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    /// Grade ids in rank order
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[GradeId] {
        &self.grades
    }

    /// Grades in rank order with their positional metadata
    pub fn grades(&self) -> impl Iterator<Item = Grade> + '_ {
        self.grades.iter().enumerate().map(|(rank, id)| Grade {
            id: id.clone(),
            rank,
            is_base: rank == self.base,
        })
    }

    /// The base grade id
    #[inline]
    #[must_use]
    pub fn base(&self) -> &GradeId {
        &self.grades[self.base]
    }

    /// Rank of the base grade
    #[inline]
    #[must_use]
    pub fn base_rank(&self) -> usize {
        self.base
    }

    /// Whether the id belongs to this ladder
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &GradeId) -> bool {
        self.rank_of(id).is_some()
    }

    /// Rank of a grade, `None` if unknown
    #[must_use]
    pub fn rank_of(&self, id: &GradeId) -> Option<usize> {
        self.grades.iter().position(|g| g == id)
    }

    /// Whether the id is the base grade
    #[inline]
    #[must_use]
    pub fn is_base(&self, id: &GradeId) -> bool {
        self.base() == id
    }

    /// Number of steps between a grade and the base
    #[must_use]
    pub fn distance_from_base(&self, id: &GradeId) -> Option<usize> {
        self.rank_of(id).map(|rank| rank.abs_diff(self.base))
    }

    /// Adjacent grade one step closer to the base
    ///
    /// `None` for the base itself and for ids outside the ladder.
    #[must_use]
    pub fn neighbor_toward_base(&self, id: &GradeId) -> Option<&GradeId> {
        let rank = self.rank_of(id)?;
        match rank.cmp(&self.base) {
            std::cmp::Ordering::Less => self.grades.get(rank + 1),
            std::cmp::Ordering::Greater => self.grades.get(rank - 1),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Grades ordered by increasing distance from the base
    ///
    /// The base comes first; grades at equal distance are ordered by rank, so
    /// the higher-paid side resolves first. Every grade's neighbor toward the
    /// base appears before it.
    #[must_use]
    pub fn propagation_order(&self) -> Vec<&GradeId> {
        let mut order = Vec::with_capacity(self.grades.len());
        order.push(self.base());

        let max_distance = self.base.max(self.grades.len() - 1 - self.base);
        for distance in 1..=max_distance {
            if let Some(above) = self.base.checked_sub(distance) {
                order.push(&self.grades[above]);
            }
            if let Some(below) = self.grades.get(self.base + distance) {
                order.push(below);
            }
        }

        order
    }

    /// Wire form of this ladder
    #[must_use]
    pub fn spec(&self) -> LadderSpec {
        LadderSpec {
            grades: self.grades.clone(),
            base: self.base().clone(),
        }
    }
}

impl TryFrom<LadderSpec> for GradeLadder {
    type Error = LadderError;

    fn try_from(spec: LadderSpec) -> Result<Self, Self::Error> {
        Self::new(spec.grades, &spec.base)
    }
}

impl From<GradeLadder> for LadderSpec {
    fn from(ladder: GradeLadder) -> Self {
        ladder.spec()
    }
}

/// Errors raised while building a ladder
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LadderError {
    /// No grades given
    #[error("invalid ladder: no grades given")]
    Empty,

    /// Same id listed twice
    #[error("invalid ladder: grade '{0}' listed more than once")]
    DuplicateGrade(GradeId),

    /// Base id missing from the grade list
    #[error("invalid ladder: base grade '{0}' is not in the grade list")]
    BaseNotFound(GradeId),

    /// Malformed grade id
    #[error("invalid ladder: {0}")]
    InvalidGradeId(#[from] GradeIdError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> GradeId {
        GradeId::new(s).unwrap()
    }

    fn five_grades(base: &str) -> GradeLadder {
        GradeLadder::from_names(["Top", "Lead", "Senior", "Mid", "Junior"], base).unwrap()
    }

    #[test]
    fn ladder_rejects_empty() {
        let result = GradeLadder::new(Vec::new(), &id("Base"));
        assert_eq!(result, Err(LadderError::Empty));
    }

    #[test]
    fn ladder_rejects_duplicates() {
        let result = GradeLadder::from_names(["A", "B", "A"], "B");
        assert_eq!(result, Err(LadderError::DuplicateGrade(id("A"))));
    }

    #[test]
    fn ladder_rejects_missing_base() {
        let result = GradeLadder::from_names(["A", "B"], "C");
        assert_eq!(result, Err(LadderError::BaseNotFound(id("C"))));
    }

    #[test]
    fn ladder_rejects_blank_name() {
        let result = GradeLadder::from_names(["A", " "], "A");
        assert!(matches!(result, Err(LadderError::InvalidGradeId(_))));
    }

    #[test]
    fn ladder_rank_and_base() {
        let ladder = five_grades("Senior");
        assert_eq!(ladder.rank_of(&id("Top")), Some(0));
        assert_eq!(ladder.rank_of(&id("Junior")), Some(4));
        assert_eq!(ladder.rank_of(&id("Intern")), None);
        assert!(ladder.is_base(&id("Senior")));
        assert!(!ladder.is_base(&id("Mid")));
        assert_eq!(ladder.base_rank(), 2);
    }

    #[test]
    fn neighbor_toward_base_points_inward() {
        let ladder = five_grades("Senior");
        assert_eq!(ladder.neighbor_toward_base(&id("Top")), Some(&id("Lead")));
        assert_eq!(ladder.neighbor_toward_base(&id("Lead")), Some(&id("Senior")));
        assert_eq!(ladder.neighbor_toward_base(&id("Senior")), None);
        assert_eq!(ladder.neighbor_toward_base(&id("Mid")), Some(&id("Senior")));
        assert_eq!(ladder.neighbor_toward_base(&id("Junior")), Some(&id("Mid")));
        assert_eq!(ladder.neighbor_toward_base(&id("Intern")), None);
    }

    #[test]
    fn propagation_order_base_in_middle() {
        let ladder = five_grades("Senior");
        let order: Vec<&str> = ladder.propagation_order().iter().map(|g| g.as_str()).collect();
        assert_eq!(order, vec!["Senior", "Lead", "Mid", "Top", "Junior"]);
    }

    #[test]
    fn propagation_order_base_at_bottom() {
        let ladder = five_grades("Junior");
        let order: Vec<&str> = ladder.propagation_order().iter().map(|g| g.as_str()).collect();
        assert_eq!(order, vec!["Junior", "Mid", "Senior", "Lead", "Top"]);
    }

    #[test]
    fn propagation_order_resolves_neighbors_first() {
        for base in ["Top", "Lead", "Senior", "Mid", "Junior"] {
            let ladder = five_grades(base);
            let order = ladder.propagation_order();
            assert_eq!(order.len(), ladder.len());
            for (pos, grade) in order.iter().enumerate() {
                if let Some(neighbor) = ladder.neighbor_toward_base(grade) {
                    let neighbor_pos = order.iter().position(|g| *g == neighbor).unwrap();
                    assert!(neighbor_pos < pos, "{neighbor} must precede {grade}");
                }
            }
        }
    }

    #[test]
    fn grades_flag_base() {
        let ladder = five_grades("Mid");
        let grades: Vec<Grade> = ladder.grades().collect();
        assert_eq!(grades.len(), 5);
        assert_eq!(grades.iter().filter(|g| g.is_base).count(), 1);
        assert_eq!(grades[3].id, id("Mid"));
        assert_eq!(grades[3].rank, 3);
    }

    #[test]
    fn ladder_serde_round_trip_validates() {
        let ladder = five_grades("Lead");
        let json = serde_json::to_string(&ladder).unwrap();
        let back: GradeLadder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ladder);

        let bad = r#"{"grades":["A","B"],"base":"Z"}"#;
        assert!(serde_json::from_str::<GradeLadder>(bad).is_err());
    }

    #[test]
    fn single_grade_ladder() {
        let ladder = GradeLadder::from_names(["Only"], "Only").unwrap();
        assert_eq!(ladder.propagation_order().len(), 1);
        assert_eq!(ladder.distance_from_base(&id("Only")), Some(0));
    }
}
