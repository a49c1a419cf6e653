mod ids;
mod lesson;
mod progress;
mod session;

pub use ids::{LessonId, ParseIdError};
pub use lesson::{Lesson, Validator};
pub use progress::Progress;
pub use session::{LessonSession, SessionBook, SubmissionPhase};
