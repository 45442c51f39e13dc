use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::export::CsvExport;
use crate::models::{Course, CourseDraft, Enrollment, EnrollmentStatus};
use crate::normalize::{normalize_courses, normalize_enrollments};
use crate::store::{Collection, RawRecord, RemoteStore, StoreEvent};
use crate::view::{
    self, CourseFilter, EnrollmentStats, Filters, Page, StatusFilter, TimeRange,
};

use super::session::ViewSession;

/// Most live courses the dashboard lets an admin keep.
pub const COURSE_CAP: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteState {
    pub loading: bool,
    pub error: Option<String>,
}

/// Result of a write intent. Failures are also recorded in the matching [`WriteState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T = ()> {
    Done(T),
    /// Not sent: empty id, or the same control already has a write in flight.
    Skipped,
    Failed(String),
}

impl<T> WriteOutcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, WriteOutcome::Done(_))
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteControl {
    Status,
    Course,
}

#[derive(Debug)]
struct ViewState {
    enrollments: Vec<Enrollment>,
    courses: Vec<Course>,
    enrollments_loaded: bool,
    courses_loaded: bool,
    filters: Filters,
    selected_id: Option<String>,
    page: usize,
    status_write: WriteState,
    course_write: WriteState,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            enrollments: Vec::new(),
            courses: Vec::new(),
            enrollments_loaded: false,
            courses_loaded: false,
            filters: Filters::default(),
            selected_id: None,
            page: 1,
            status_write: WriteState::default(),
            course_write: WriteState::default(),
        }
    }
}

impl ViewState {
    fn write_state_mut(&mut self, control: WriteControl) -> &mut WriteState {
        match control {
            WriteControl::Status => &mut self.status_write,
            WriteControl::Course => &mut self.course_write,
        }
    }

    fn filtered(&self) -> Vec<&Enrollment> {
        view::apply_filters(&self.enrollments, &self.filters)
    }
}

/// Everything the presentation layer draws, taken under one lock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub filters: Filters,
    pub page: Page<Enrollment>,
    pub active: Option<Enrollment>,
    pub stats: EnrollmentStats,
    pub courses: Vec<Course>,
    pub status_write: WriteState,
    pub course_write: WriteState,
    pub enrollments_loaded: bool,
    pub courses_loaded: bool,
}

/// Admin dashboard state: the latest enrollments and courses, the reviewer's
/// filters and selection, and the status/course actions. Records only change
/// when the store pushes a snapshot; actions never touch them directly.
#[derive(Clone)]
pub struct Dashboard {
    store: Arc<dyn RemoteStore>,
    state: Arc<Mutex<ViewState>>,
    page_size: usize,
}

impl Dashboard {
    pub fn new(store: Arc<dyn RemoteStore>, page_size: usize) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(ViewState::default())),
            page_size: page_size.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to both collections for as long as the returned session lives.
    pub fn mount(&self) -> ViewSession {
        info!("mounting dashboard view");
        ViewSession::new(
            self.clone(),
            self.store.subscribe(Collection::Enrollments),
            self.store.subscribe(Collection::Courses),
        )
    }

    pub fn apply_event(&self, collection: Collection, event: StoreEvent) {
        let snapshot = match event {
            StoreEvent::Snapshot(snapshot) => snapshot,
            StoreEvent::Error(message) => {
                warn!("{} subscription error, keeping last snapshot: {}", collection, message);
                return;
            }
        };

        match collection {
            Collection::Enrollments => {
                let enrollments = normalize_enrollments(snapshot.as_ref());
                info!("received {} enrollments", enrollments.len());
                let mut state = self.lock();
                state.enrollments = enrollments;
                state.enrollments_loaded = true;
                state.page = 1;
            }
            Collection::Courses => {
                let courses = normalize_courses(snapshot.as_ref());
                info!("received {} courses", courses.len());
                let mut state = self.lock();
                state.courses = courses;
                state.courses_loaded = true;
            }
        }
    }

    // Filters and navigation

    pub fn filters(&self) -> Filters {
        self.lock().filters.clone()
    }

    pub fn set_filters(&self, filters: Filters) {
        let mut state = self.lock();
        state.filters = filters;
        state.page = 1;
    }

    pub fn set_search(&self, search: impl Into<String>) {
        let mut state = self.lock();
        state.filters.search = search.into();
        state.page = 1;
    }

    pub fn set_course_filter(&self, course: CourseFilter) {
        let mut state = self.lock();
        state.filters.course = course;
        state.page = 1;
    }

    pub fn set_status_filter(&self, status: StatusFilter) {
        let mut state = self.lock();
        state.filters.status = status;
        state.page = 1;
    }

    pub fn set_time_range(&self, time_range: TimeRange) {
        self.lock().filters.time_range = time_range;
    }

    pub fn select(&self, id: impl Into<String>) {
        self.lock().selected_id = Some(id.into());
    }

    pub fn selected_id(&self) -> Option<String> {
        self.lock().selected_id.clone()
    }

    pub fn page(&self) -> usize {
        self.lock().page
    }

    /// Moves to `page`, clamped to the pages the filtered list has. Returns the page landed on.
    pub fn go_to_page(&self, page: usize) -> usize {
        let mut state = self.lock();
        let total = view::total_pages(state.filtered().len(), self.page_size);
        state.page = view::clamp_page(page, total);
        state.page
    }

    pub fn next_page(&self) -> usize {
        let current = self.page();
        self.go_to_page(current.saturating_add(1))
    }

    pub fn previous_page(&self) -> usize {
        let current = self.page();
        self.go_to_page(current.saturating_sub(1))
    }

    // Projections

    pub fn enrollments(&self) -> Vec<Enrollment> {
        self.lock().enrollments.clone()
    }

    pub fn courses(&self) -> Vec<Course> {
        self.lock().courses.clone()
    }

    pub fn filtered(&self) -> Vec<Enrollment> {
        self.lock().filtered().into_iter().cloned().collect()
    }

    pub fn active(&self) -> Option<Enrollment> {
        let state = self.lock();
        let filtered = state.filtered();
        view::select_active(&filtered, state.selected_id.as_deref()).cloned()
    }

    pub fn current_page(&self) -> Page<Enrollment> {
        let state = self.lock();
        let filtered = state.filtered();
        view::paginate(&filtered, self.page_size, state.page).cloned()
    }

    pub fn stats(&self) -> EnrollmentStats {
        view::aggregate(&self.lock().filtered())
    }

    /// `(id, title)` pairs for the course filter.
    pub fn course_options(&self) -> Vec<(String, String)> {
        self.lock()
            .courses
            .iter()
            .map(|course| (course.id.clone(), course.title.clone()))
            .collect()
    }

    pub fn can_add_course(&self) -> bool {
        let state = self.lock();
        state.courses_loaded && state.courses.len() < COURSE_CAP
    }

    pub fn status_write(&self) -> WriteState {
        self.lock().status_write.clone()
    }

    pub fn course_write(&self) -> WriteState {
        self.lock().course_write.clone()
    }

    pub fn view(&self) -> DashboardView {
        let state = self.lock();
        let filtered = state.filtered();

        DashboardView {
            filters: state.filters.clone(),
            page: view::paginate(&filtered, self.page_size, state.page).cloned(),
            active: view::select_active(&filtered, state.selected_id.as_deref()).cloned(),
            stats: view::aggregate(&filtered),
            courses: state.courses.clone(),
            status_write: state.status_write.clone(),
            course_write: state.course_write.clone(),
            enrollments_loaded: state.enrollments_loaded,
            courses_loaded: state.courses_loaded,
        }
    }

    /// CSV of the filtered list (all pages).
    pub fn export(&self, date: NaiveDate) -> CsvExport {
        let state = self.lock();
        CsvExport::new(&state.filtered(), date)
    }

    // Write intents

    pub async fn change_status(&self, id: &str, status: EnrollmentStatus) -> WriteOutcome {
        if id.is_empty() {
            return WriteOutcome::Skipped;
        }
        if !self.begin_write(WriteControl::Status) {
            return WriteOutcome::Skipped;
        }

        let mut partial = RawRecord::new();
        partial.insert("status".to_string(), Value::from(status.as_str()));
        let result = self.store.update(Collection::Enrollments, id, partial).await;
        if result.is_ok() {
            info!("enrollment {} set to {}", id, status);
        }
        self.finish_write(WriteControl::Status, result, "updating status")
    }

    /// Updates `existing_id`, or creates a new course when it is `None`.
    /// Creating is refused without contacting the store before the first course
    /// snapshot has arrived or once [`COURSE_CAP`] courses exist.
    pub async fn save_course(&self, existing_id: Option<&str>, draft: &CourseDraft) -> WriteOutcome<String> {
        if !self.begin_write(WriteControl::Course) {
            return WriteOutcome::Skipped;
        }

        let payload = match draft.to_payload() {
            Ok(payload) => payload,
            Err(e) => return self.finish_write(WriteControl::Course, Err(e.into()), "saving the course"),
        };

        let result = match existing_id.filter(|id| !id.is_empty()) {
            Some(id) => self
                .store
                .update(Collection::Courses, id, payload)
                .await
                .map(|()| id.to_string()),
            None => {
                let (loaded, live) = {
                    let state = self.lock();
                    (state.courses_loaded, state.courses.len())
                };
                if !loaded {
                    Err(AppError::Conflict(
                        "Courses are still loading. Try again in a moment.".to_string(),
                    ))
                } else if live >= COURSE_CAP {
                    Err(AppError::Conflict(format!(
                        "You can only have up to {} courses. Delete one before adding another.",
                        COURSE_CAP
                    )))
                } else {
                    self.store.create(Collection::Courses, payload).await
                }
            }
        };
        if let Ok(id) = &result {
            info!("saved course {}", id);
        }
        self.finish_write(WriteControl::Course, result, "saving the course")
    }

    /// Callers confirm with the user before calling this.
    pub async fn delete_course(&self, id: &str) -> WriteOutcome {
        if id.is_empty() {
            return WriteOutcome::Skipped;
        }
        if !self.begin_write(WriteControl::Course) {
            return WriteOutcome::Skipped;
        }

        let result = self.store.delete(Collection::Courses, id).await;
        if result.is_ok() {
            info!("deleted course {}", id);
        }
        self.finish_write(WriteControl::Course, result, "deleting the course")
    }

    fn begin_write(&self, control: WriteControl) -> bool {
        let mut state = self.lock();
        let slot = state.write_state_mut(control);
        if slot.loading {
            debug!("{:?} write already in flight, ignoring", control);
            return false;
        }
        slot.loading = true;
        slot.error = None;
        true
    }

    fn finish_write<T>(&self, control: WriteControl, result: Result<T, AppError>, action: &str) -> WriteOutcome<T> {
        let outcome = match result {
            Ok(value) => WriteOutcome::Done(value),
            Err(e) => {
                error!("{:?} write failed while {}: {}", control, action, e);
                WriteOutcome::Failed(e.user_message(action))
            }
        };

        let mut state = self.lock();
        let slot = state.write_state_mut(control);
        slot.loading = false;
        slot.error = match &outcome {
            WriteOutcome::Failed(message) => Some(message.clone()),
            _ => None,
        };
        outcome
    }
}
