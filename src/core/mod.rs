//! Core error types shared by every module.
//!
//! - [`error`] - the [`SkillsError`] taxonomy and user-facing [`ErrorContext`]
//! - [`file_error`] - io errors annotated with operation, path and purpose

pub mod error;
pub mod file_error;

pub use error::{ErrorContext, SkillsError, create_error_context, user_friendly_error};
pub use file_error::{FileOperation, FileOperationError, FileResultExt};
