pub mod dashboard;
pub mod session;

pub use dashboard::{COURSE_CAP, Dashboard, DashboardView, WriteOutcome, WriteState};
pub use session::ViewSession;
