mod lesson_vm;
mod markdown_vm;
mod sidebar_vm;

pub use lesson_vm::{Feedback, LessonPageVm, feedback_for, map_lesson_page, merge_finished_session};
pub use markdown_vm::{inline_markdown_to_html, markdown_to_html, sanitize_html};
pub use sidebar_vm::{LessonLinkVm, SidebarVm, map_sidebar};
