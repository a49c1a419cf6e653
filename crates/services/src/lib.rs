#![forbid(unsafe_code)]

pub mod app_services;
pub mod engine;
pub mod error;
pub mod progress_service;
pub mod submission_service;

pub use app_services::AppServices;
pub use engine::ExecutionEngine;
pub use error::{AppServicesError, EngineError, ProgressServiceError, SubmissionError};
pub use progress_service::ProgressService;
pub use submission_service::{SubmissionOutcome, SubmissionService};
