use std::collections::BTreeMap;

use crate::model::ids::LessonId;

/// Completion flags keyed by lesson id.
///
/// A lesson without an entry has never been completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    entries: BTreeMap<LessonId, bool>,
}

impl Progress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a persisted row.
    pub fn insert(&mut self, lesson_id: LessonId, completed: bool) {
        self.entries.insert(lesson_id, completed);
    }

    #[must_use]
    pub fn get(&self, lesson_id: &LessonId) -> Option<bool> {
        self.entries.get(lesson_id).copied()
    }

    #[must_use]
    pub fn is_complete(&self, lesson_id: &LessonId) -> bool {
        self.get(lesson_id).unwrap_or(false)
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.entries.values().filter(|done| **done).count()
    }

    /// Share of `total` lessons completed, clamped to `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction_of(&self, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (self.completed_count() as f64 / total as f64).min(1.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LessonId, bool)> {
        self.entries.iter().map(|(id, done)| (id, *done))
    }
}

impl FromIterator<(LessonId, bool)> for Progress {
    fn from_iter<T: IntoIterator<Item = (LessonId, bool)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_completed_rows() {
        let progress: Progress = [
            (LessonId::new("intro"), true),
            (LessonId::new("variables"), false),
            (LessonId::new("functions"), true),
        ]
        .into_iter()
        .collect();

        assert_eq!(progress.completed_count(), 2);
        assert!(progress.is_complete(&LessonId::new("intro")));
        assert!(!progress.is_complete(&LessonId::new("variables")));
        assert!(!progress.is_complete(&LessonId::new("missing")));
    }

    #[test]
    fn fraction_handles_empty_catalog() {
        let progress = Progress::new();
        assert!(progress.fraction_of(0).abs() < f64::EPSILON);
    }

    #[test]
    fn fraction_of_total() {
        let mut progress = Progress::new();
        progress.insert(LessonId::new("intro"), true);
        assert!((progress.fraction_of(4) - 0.25).abs() < f64::EPSILON);
    }
}
