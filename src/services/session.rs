use tracing::{debug, info};

use crate::store::{Collection, Subscription};

use super::dashboard::Dashboard;

/// Live subscriptions of one mounted view.
///
/// Events from each collection are applied in the order the store sent them.
/// The two collections are not ordered against each other. After
/// [`ViewSession::close`] nothing else reaches the dashboard.
pub struct ViewSession {
    dashboard: Dashboard,
    enrollments: Subscription,
    courses: Subscription,
}

impl ViewSession {
    pub(crate) fn new(dashboard: Dashboard, enrollments: Subscription, courses: Subscription) -> Self {
        Self {
            dashboard,
            enrollments,
            courses,
        }
    }

    /// Waits for the next event from either collection and applies it.
    /// Returns false once both subscriptions are closed.
    pub async fn pump(&mut self) -> bool {
        let (collection, event) = tokio::select! {
            Some(event) = self.enrollments.recv() => (Collection::Enrollments, event),
            Some(event) = self.courses.recv() => (Collection::Courses, event),
            else => return false,
        };
        debug!("applying {} event", collection);
        self.dashboard.apply_event(collection, event);
        true
    }

    pub fn close(&mut self) {
        self.enrollments.close();
        self.courses.close();
        info!("unmounted dashboard view");
    }

    pub fn is_closed(&self) -> bool {
        self.enrollments.is_closed() && self.courses.is_closed()
    }
}
