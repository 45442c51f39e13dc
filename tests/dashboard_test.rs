use std::sync::Arc;
use std::time::Duration;

use enrollment_dashboard::models::{CourseDraft, EnrollmentStatus, LearningPoint};
use enrollment_dashboard::services::{COURSE_CAP, Dashboard, WriteOutcome};
use enrollment_dashboard::store::{Collection, MemoryStore, RemoteStore, StoreEvent};
use enrollment_dashboard::view::{CourseFilter, Filters, StatusFilter, TimeRange};
use serde_json::{Value, json};

fn enrollments_fixture() -> Value {
    json!({
        "-E1": { "childName": "Ava Lee", "parentName": "Sam Lee", "courseId": "c1", "status": "pending" },
        "-E2": { "kidName": "Noah Park", "parentName": "Jin Park", "courseId": "c2", "status": "approved" },
        "-E3": { "childName": "Mia Chen", "parentName": "Wei Chen", "courseId": "c2" },
        "-E4": { "childName": "Leo Diaz", "parentName": "Ana Diaz", "courseId": "c1", "status": "waitlisted" },
        "-E5": { "childName": "Zoe Kim", "parentName": "Min Kim", "courseId": "c3", "status": "approved" }
    })
}

fn courses_fixture(count: usize) -> Value {
    let mut map = serde_json::Map::new();
    for i in 1..=count {
        map.insert(format!("c{}", i), json!({ "title": format!("Course {}", i), "createdAt": 1_700_000_000_000i64 }));
    }
    Value::Object(map)
}

fn draft(title: &str) -> CourseDraft {
    CourseDraft {
        title: title.to_string(),
        age_range: "6-8".to_string(),
        what_you_will_learn: vec![LearningPoint::default()],
        ..CourseDraft::default()
    }
}

async fn mounted(store: &Arc<MemoryStore>, page_size: usize) -> (Dashboard, enrollment_dashboard::ViewSession) {
    let dashboard = Dashboard::new(store.clone(), page_size);
    let mut session = dashboard.mount();
    // initial snapshot of each collection
    assert!(session.pump().await);
    assert!(session.pump().await);
    (dashboard, session)
}

#[tokio::test]
async fn test_mount_delivers_current_contents_immediately() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    store.set_collection(Collection::Courses, courses_fixture(2));

    let (dashboard, _session) = mounted(&store, 7).await;

    let view = dashboard.view();
    assert!(view.enrollments_loaded);
    assert!(view.courses_loaded);
    assert_eq!(view.stats.total, 5);
    assert_eq!(view.courses.len(), 2);
    assert_eq!(dashboard.enrollments()[1].child_name, "Noah Park");
    assert_eq!(dashboard.enrollments()[2].status, EnrollmentStatus::Pending);
    assert_eq!(
        dashboard.course_options(),
        vec![
            ("c1".to_string(), "Course 1".to_string()),
            ("c2".to_string(), "Course 2".to_string())
        ]
    );
}

#[tokio::test]
async fn test_empty_collection_yields_empty_lists() {
    let store = Arc::new(MemoryStore::new());
    let (dashboard, _session) = mounted(&store, 7).await;

    let view = dashboard.view();
    assert!(view.enrollments_loaded);
    assert!(view.page.items.is_empty());
    assert_eq!(view.page.total_pages, 1);
    assert!(view.active.is_none());
    assert!(dashboard.courses().is_empty());
}

#[tokio::test]
async fn test_snapshots_replace_state_wholesale() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, mut session) = mounted(&store, 7).await;

    store.set_collection(Collection::Enrollments, json!({ "-E9": { "childName": "Solo" } }));
    assert!(session.pump().await);

    let enrollments = dashboard.enrollments();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0].id, "-E9");

    store.set_collection(Collection::Enrollments, Value::Null);
    assert!(session.pump().await);
    assert!(dashboard.enrollments().is_empty());
}

#[tokio::test]
async fn test_channel_error_keeps_last_known_good_data() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, mut session) = mounted(&store, 7).await;

    store.emit_error(Collection::Enrollments, "permission denied");
    assert!(session.pump().await);

    assert_eq!(dashboard.enrollments().len(), 5);
}

#[tokio::test]
async fn test_closed_session_ignores_late_snapshots() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, mut session) = mounted(&store, 7).await;
    assert_eq!(store.subscriber_count(Collection::Enrollments), 1);

    session.close();
    assert!(session.is_closed());
    assert_eq!(store.subscriber_count(Collection::Enrollments), 0);

    store.set_collection(Collection::Enrollments, json!({}));
    assert!(!session.pump().await);
    assert_eq!(dashboard.enrollments().len(), 5);
}

#[tokio::test]
async fn test_filters_drive_pages_selection_and_stats() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, _session) = mounted(&store, 2).await;

    assert_eq!(dashboard.current_page().total_pages, 3);
    assert_eq!(dashboard.go_to_page(3), 3);
    assert_eq!(dashboard.next_page(), 3);
    assert_eq!(dashboard.go_to_page(0), 1);
    assert_eq!(dashboard.previous_page(), 1);
    dashboard.go_to_page(2);

    dashboard.select("-E4");
    dashboard.set_course_filter(CourseFilter::Id("c2".to_string()));
    assert_eq!(dashboard.page(), 1);

    let view = dashboard.view();
    let ids: Vec<&str> = view.page.items.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["-E2", "-E3"]);
    assert_eq!(view.active.map(|e| e.id), Some("-E2".to_string()));
    assert_eq!(view.stats.total, 2);
    assert_eq!(view.stats.approved, 1);
    assert_eq!(view.stats.pending, 1);

    dashboard.set_status_filter(StatusFilter::Only(EnrollmentStatus::Pending));
    dashboard.set_search("mia");
    assert_eq!(dashboard.active().map(|e| e.id), Some("-E3".to_string()));
}

#[tokio::test]
async fn test_new_snapshot_resets_page() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, mut session) = mounted(&store, 2).await;

    dashboard.go_to_page(3);
    store.emit(Collection::Enrollments);
    assert!(session.pump().await);
    assert_eq!(dashboard.page(), 1);
}

#[tokio::test]
async fn test_status_change_waits_for_the_store_push() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, mut session) = mounted(&store, 7).await;

    let outcome = dashboard.change_status("-E1", EnrollmentStatus::Approved).await;
    assert_eq!(outcome, WriteOutcome::Done(()));
    assert_eq!(store.update_calls(), 1);
    assert!(!dashboard.status_write().loading);
    let stored = store.record(Collection::Enrollments, "-E1").expect("record still stored");
    assert_eq!(stored.get("status"), Some(&json!("approved")));
    assert!(stored.get("updatedAt").is_some());

    // nothing changes locally until the snapshot arrives
    assert_eq!(dashboard.enrollments()[0].status, EnrollmentStatus::Pending);
    assert!(session.pump().await);
    assert_eq!(dashboard.enrollments()[0].status, EnrollmentStatus::Approved);
}

#[tokio::test]
async fn test_failed_status_change_records_error_and_keeps_status() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, _session) = mounted(&store, 7).await;

    store.fail_writes(Some("database unavailable"));
    let outcome = dashboard.change_status("-E1", EnrollmentStatus::Waitlisted).await;

    let WriteOutcome::Failed(message) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(!message.is_empty());
    let write = dashboard.status_write();
    assert!(!write.loading);
    assert_eq!(write.error.as_deref(), Some(message.as_str()));
    assert_eq!(dashboard.enrollments()[0].status, EnrollmentStatus::Pending);

    // retrying the same action clears the error
    store.fail_writes(None);
    assert!(dashboard.change_status("-E1", EnrollmentStatus::Waitlisted).await.is_done());
    assert_eq!(dashboard.status_write().error, None);
}

#[tokio::test]
async fn test_hung_write_keeps_loading_and_blocks_duplicates_but_not_reads() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, mut session) = mounted(&store, 7).await;

    store.hang_writes(true);
    let pending = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.change_status("-E1", EnrollmentStatus::Approved).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(dashboard.status_write().loading);
    assert_eq!(
        dashboard.change_status("-E1", EnrollmentStatus::Approved).await,
        WriteOutcome::Skipped
    );
    assert_eq!(store.update_calls(), 1);

    // course controls are independent of the status control
    store.hang_writes(false);
    assert!(dashboard.delete_course("missing").await.is_done());

    // one courses snapshot from the delete, one enrollments snapshot from here
    store.set_collection(Collection::Enrollments, json!({ "-E7": { "childName": "Late" } }));
    assert!(session.pump().await);
    assert!(session.pump().await);
    assert_eq!(dashboard.enrollments().len(), 1);

    let still_waiting = tokio::time::timeout(Duration::from_millis(100), pending).await;
    assert!(still_waiting.is_err());
    assert!(dashboard.status_write().loading);
}

#[tokio::test]
async fn test_empty_id_status_change_is_skipped() {
    let store = Arc::new(MemoryStore::new());
    let dashboard = Dashboard::new(store.clone(), 7);
    assert_eq!(dashboard.change_status("", EnrollmentStatus::Approved).await, WriteOutcome::Skipped);
    assert_eq!(store.update_calls(), 0);
}

#[tokio::test]
async fn test_create_course_is_refused_at_cap_without_store_call() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Courses, courses_fixture(COURSE_CAP));
    let (dashboard, _session) = mounted(&store, 7).await;

    assert!(!dashboard.can_add_course());
    let outcome = dashboard.save_course(None, &draft("Fifth course")).await;

    assert!(matches!(outcome, WriteOutcome::Failed(_)));
    assert_eq!(store.create_calls(), 0);
    assert!(dashboard.course_write().error.is_some());
    assert!(!dashboard.course_write().loading);
}

#[tokio::test]
async fn test_create_then_edit_course() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Courses, courses_fixture(1));
    let (dashboard, mut session) = mounted(&store, 7).await;

    let WriteOutcome::Done(id) = dashboard.save_course(None, &draft("Web & App Builders")).await else {
        panic!("create should succeed");
    };
    assert_eq!(store.create_calls(), 1);
    assert!(session.pump().await);

    let created = dashboard
        .courses()
        .into_iter()
        .find(|c| c.id == id)
        .expect("created course arrives in the next snapshot");
    assert_eq!(created.title, "Web & App Builders");
    assert!(created.created_at.is_some());
    assert_eq!(created.created_at, created.updated_at);
    assert_eq!(created.what_you_will_learn, vec![LearningPoint::default()]);

    let mut edit = CourseDraft::from_course(&created);
    edit.schedule = "Saturdays".to_string();
    let outcome = dashboard.save_course(Some(&id), &edit).await;
    assert_eq!(outcome, WriteOutcome::Done(id.clone()));
    assert_eq!(store.update_calls(), 1);
    assert_eq!(store.create_calls(), 1);

    assert!(session.pump().await);
    let edited = dashboard.courses().into_iter().find(|c| c.id == id).expect("course still there");
    assert_eq!(edited.schedule, "Saturdays");
}

#[tokio::test]
async fn test_editing_at_cap_is_allowed() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Courses, courses_fixture(COURSE_CAP));
    let (dashboard, _session) = mounted(&store, 7).await;

    let outcome = dashboard.save_course(Some("c2"), &draft("Renamed")).await;
    assert_eq!(outcome, WriteOutcome::Done("c2".to_string()));
    assert_eq!(store.update_calls(), 1);
}

#[tokio::test]
async fn test_delete_course_removes_it_on_next_snapshot() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Courses, courses_fixture(3));
    let (dashboard, mut session) = mounted(&store, 7).await;

    assert!(dashboard.delete_course("c2").await.is_done());
    assert_eq!(store.delete_calls(), 1);
    assert_eq!(dashboard.courses().len(), 3);

    assert!(session.pump().await);
    let ids: Vec<String> = dashboard.courses().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["c1", "c3"]);

    assert_eq!(dashboard.delete_course("").await, WriteOutcome::Skipped);
    assert_eq!(store.delete_calls(), 1);
}

#[tokio::test]
async fn test_export_covers_filtered_list_across_pages() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, _session) = mounted(&store, 1).await;

    dashboard.set_course_filter(CourseFilter::Id("c1".to_string()));
    let date = chrono::NaiveDate::from_ymd_opt(2024, 7, 15).expect("valid date");
    let export = dashboard.export(date);

    assert_eq!(export.file_name, "enrollments-2024-07-15.csv");
    assert_eq!(export.rows, 2);
    assert_eq!(export.contents.lines().count(), 3);

    let dir = tempfile::tempdir().expect("temp dir");
    let path = export.write_to(&dir.path().join("exports")).expect("export written");
    let written = std::fs::read_to_string(path).expect("export readable");
    assert_eq!(written, export.contents);
}

#[tokio::test]
async fn test_store_create_stamps_timestamps() {
    let store = MemoryStore::new();
    let id = store
        .create(Collection::Courses, serde_json::Map::new())
        .await
        .expect("create succeeds");
    let record = store.record(Collection::Courses, &id).expect("record stored");
    assert!(record.get("createdAt").and_then(Value::as_i64).is_some());
    assert_eq!(record.get("createdAt"), record.get("updatedAt"));
}

#[tokio::test]
async fn test_time_range_is_recorded_without_moving_the_page() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, _session) = mounted(&store, 2).await;

    assert_eq!(dashboard.filters().time_range, TimeRange::Last30Days);
    dashboard.go_to_page(2);
    dashboard.set_time_range(TimeRange::Last7Days);

    assert_eq!(dashboard.filters().time_range, TimeRange::Last7Days);
    assert_eq!(dashboard.page(), 2);
    assert_eq!(dashboard.filtered().len(), 5);
}

#[tokio::test]
async fn test_set_filters_replaces_all_filters_and_resets_page() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Enrollments, enrollments_fixture());
    let (dashboard, _session) = mounted(&store, 2).await;

    dashboard.go_to_page(3);
    dashboard.select("-E5");
    assert_eq!(dashboard.selected_id().as_deref(), Some("-E5"));

    let filters = Filters {
        search: "park".to_string(),
        status: StatusFilter::Only(EnrollmentStatus::Approved),
        ..Filters::default()
    };
    dashboard.set_filters(filters.clone());

    assert_eq!(dashboard.filters(), filters);
    assert_eq!(dashboard.page(), 1);
    // selection outside the filtered list falls back to its first record
    assert_eq!(dashboard.selected_id().as_deref(), Some("-E5"));
    assert_eq!(dashboard.active().map(|e| e.id), Some("-E2".to_string()));
}

#[tokio::test]
async fn test_courses_arriving_before_enrollments() {
    let store = Arc::new(MemoryStore::new());
    let dashboard = Dashboard::new(store.clone(), 7);

    let courses = courses_fixture(2).as_object().cloned();
    dashboard.apply_event(Collection::Courses, StoreEvent::Snapshot(courses));

    let view = dashboard.view();
    assert!(view.courses_loaded);
    assert!(!view.enrollments_loaded);
    assert_eq!(view.courses.len(), 2);
    assert_eq!(view.stats.total, 0);
    assert!(view.page.items.is_empty());
    assert!(view.active.is_none());

    let enrollments = enrollments_fixture().as_object().cloned();
    dashboard.apply_event(Collection::Enrollments, StoreEvent::Snapshot(enrollments));

    let view = dashboard.view();
    assert!(view.enrollments_loaded);
    assert_eq!(view.stats.total, 5);
    assert_eq!(view.courses.len(), 2);
}

#[tokio::test]
async fn test_create_course_waits_for_the_course_list() {
    let store = Arc::new(MemoryStore::new());
    store.set_collection(Collection::Courses, courses_fixture(COURSE_CAP));
    let dashboard = Dashboard::new(store.clone(), 7);

    let enrollments = enrollments_fixture().as_object().cloned();
    dashboard.apply_event(Collection::Enrollments, StoreEvent::Snapshot(enrollments));

    assert!(!dashboard.can_add_course());
    let outcome = dashboard.save_course(None, &draft("Too early")).await;

    assert!(matches!(outcome, WriteOutcome::Failed(_)));
    assert_eq!(store.create_calls(), 0);
    assert!(!dashboard.course_write().loading);

    let courses = courses_fixture(1).as_object().cloned();
    dashboard.apply_event(Collection::Courses, StoreEvent::Snapshot(courses));
    assert!(dashboard.can_add_course());
    let outcome = dashboard.save_course(None, &draft("On time")).await;
    assert!(outcome.is_done());
    assert_eq!(store.create_calls(), 1);
}
