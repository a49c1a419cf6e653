#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod model;

pub use catalog::{Catalog, CatalogError};
pub use error::Error;
pub use model::{Lesson, LessonId, LessonSession, Progress, SessionBook, SubmissionPhase};
