pub mod course;
pub mod enrollment;

pub use course::{Course, CourseDraft, LearningPoint};
pub use enrollment::{Enrollment, EnrollmentStatus, Timestamp};
