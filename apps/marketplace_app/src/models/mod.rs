// apps/marketplace_app/src/models/mod.rs

//! Row types as Postgres returns them, converted into `coursepay` models.

pub mod course;
pub mod enrollment;
pub mod sale;

pub use course::CourseRow;
pub use enrollment::EnrollmentRow;
pub use sale::{SaleRow, SaleStatusColumn};
