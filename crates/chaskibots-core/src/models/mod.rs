//! Data models for ChaskiBots EDU entities.
//!
//! Each type is the `fields` map of one Airtable table, in the shape the
//! HTTP API serves it (camelCase, absent fields omitted):
//!
//! - `Level`, `Program`, `Course`, `School`: the academic catalog
//! - `Kit`, `Lesson`: learning content filtered by grade level
//! - `User`, `Role`: students, teachers and admins with access codes
//! - `TeacherCourse`: teacher-to-course assignment with a denormalized level
//! - `TaskSubmission`: student work submitted against a lesson
//!
//! Every field is optional because Airtable omits empty cells, and the
//! same types double as partial-update payloads.

pub mod academic;
pub mod assignment;
pub mod content;
pub mod lenient;
pub mod task;
pub mod user;

pub use academic::{Course, Level, Program, School};
pub use assignment::TeacherCourse;
pub use content::{Kit, Lesson};
pub use task::{TaskStatus, TaskSubmission};
pub use user::{Role, User};
