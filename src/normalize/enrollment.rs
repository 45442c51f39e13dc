use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{Enrollment, EnrollmentStatus};
use crate::store::RawRecord;

use super::{FieldAlias, lookup, string_list, text, timestamp};

/// Legacy forms wrote `kid*` fields and a bare `timestamp`; the current form
/// writes the names listed first.
pub const ENROLLMENT_FIELDS: &[FieldAlias] = &[
    FieldAlias::new("childName", &["childName", "kidName"]),
    FieldAlias::new("childAge", &["childAge", "kidAge"]),
    FieldAlias::new("childGender", &["childGender", "kidGender"]),
    FieldAlias::new("parentName", &["parentName"]),
    FieldAlias::new("parentEmail", &["parentEmail"]),
    FieldAlias::new("parentPhone", &["parentPhone"]),
    FieldAlias::new("parentRelation", &["parentRelation"]),
    FieldAlias::new("course", &["course", "courseName"]),
    FieldAlias::new("courseId", &["courseId"]),
    FieldAlias::new("preferredTime", &["preferredTime"]),
    FieldAlias::new("startDate", &["startDate"]),
    FieldAlias::new("submittedAt", &["submittedAt", "timestamp"]),
    FieldAlias::new("interests", &["interests", "kidInterests"]),
    FieldAlias::new("status", &["status"]),
    FieldAlias::new("notes", &["notes"]),
];

/// Whole `enrollments` snapshot, in key order.
pub fn normalize_enrollments(snapshot: Option<&RawRecord>) -> Vec<Enrollment> {
    let Some(records) = snapshot else {
        return Vec::new();
    };
    records
        .iter()
        .map(|(id, value)| normalize_enrollment(id, value))
        .collect()
}

pub fn normalize_enrollment(id: &str, value: &Value) -> Enrollment {
    let empty = RawRecord::new();
    let raw = match value.as_object() {
        Some(map) => map,
        None => {
            warn!("enrollment {} is not an object, using defaults", id);
            &empty
        }
    };
    let field = |canonical: &str| lookup(ENROLLMENT_FIELDS, canonical, raw);

    Enrollment {
        id: id.to_string(),
        child_name: text(field("childName")),
        child_age: text(field("childAge")),
        child_gender: text(field("childGender")),
        parent_name: text(field("parentName")),
        parent_email: text(field("parentEmail")),
        parent_phone: text(field("parentPhone")),
        parent_relation: text(field("parentRelation")),
        course: text(field("course")),
        course_id: text(field("courseId")),
        preferred_time: text(field("preferredTime")),
        start_date: text(field("startDate")),
        submitted_at: timestamp(field("submittedAt")),
        interests: string_list(field("interests")),
        status: status(id, field("status")),
        notes: text(field("notes")),
    }
}

fn status(id: &str, value: Option<&Value>) -> EnrollmentStatus {
    let raw = text(value);
    if raw.is_empty() {
        return EnrollmentStatus::default();
    }
    raw.parse().unwrap_or_else(|e| {
        debug!("enrollment {}: {}, treating as pending", id, e);
        EnrollmentStatus::default()
    })
}
