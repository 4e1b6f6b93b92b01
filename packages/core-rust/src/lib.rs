//! Notes core: the note resource, its request DTOs, and declarative validation.

pub mod note;
pub mod validation;

pub use note::{CreateNote, Note, UpdateNote};
pub use validation::{Constraint, FieldError, FieldRules, Validate, ValidationErrors};
