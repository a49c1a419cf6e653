mod home;
mod lesson;
mod not_found;
mod sidebar;
mod state;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;

pub use home::HomeView;
pub use lesson::LessonView;
pub use not_found::NotFoundView;
pub use sidebar::Sidebar;
pub use state::{ViewError, ViewState, use_progress, view_state_from_resource};
