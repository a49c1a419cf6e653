use codify_core::{Catalog, LessonId, Progress};

/// One lesson entry in the navigation list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LessonLinkVm {
    pub id: LessonId,
    pub icon: &'static str,
    pub label: &'static str,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SidebarVm {
    pub completed: usize,
    pub total: usize,
    pub links: Vec<LessonLinkVm>,
}

impl SidebarVm {
    /// Completion as a percentage in `0..=100`, for the progress bar width.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let percent = self.completed.min(self.total) * 100 / self.total;
        u32::try_from(percent).unwrap_or(100)
    }

    #[must_use]
    pub fn summary_label(&self) -> String {
        format!("{} of {} lessons completed.", self.completed, self.total)
    }
}

/// Build the sidebar from the catalog order and stored progress.
///
/// Rows for ids the catalog does not know are ignored.
#[must_use]
pub fn map_sidebar(catalog: &Catalog, progress: &Progress) -> SidebarVm {
    let links: Vec<LessonLinkVm> = catalog
        .iter()
        .map(|lesson| {
            let id = lesson.id();
            let completed = progress.is_complete(&id);
            LessonLinkVm {
                icon: if completed { "✅" } else { "📘" },
                label: lesson.plain_title(),
                completed,
                id,
            }
        })
        .collect();
    let completed = links.iter().filter(|link| link.completed).count();

    SidebarVm {
        completed,
        total: catalog.len(),
        links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_progress_shows_every_lesson_open() {
        let vm = map_sidebar(Catalog::builtin(), &Progress::new());
        assert_eq!(vm.total, 5);
        assert_eq!(vm.completed, 0);
        assert_eq!(vm.percent(), 0);
        assert_eq!(vm.summary_label(), "0 of 5 lessons completed.");
        assert!(vm.links.iter().all(|link| link.icon == "📘"));
        assert_eq!(vm.links[0].label, "Introduction to Python");
    }

    #[test]
    fn completed_lessons_get_a_check_and_unknown_rows_are_ignored() {
        let mut progress = Progress::new();
        progress.insert(LessonId::new("intro"), true);
        progress.insert(LessonId::new("functions"), false);
        progress.insert(LessonId::new("retired_lesson"), true);

        let vm = map_sidebar(Catalog::builtin(), &progress);
        assert_eq!(vm.completed, 1);
        assert_eq!(vm.percent(), 20);
        assert_eq!(vm.links[0].icon, "✅");
        assert!(vm.links.iter().skip(1).all(|link| !link.completed));
    }
}
