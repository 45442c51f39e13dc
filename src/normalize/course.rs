use serde_json::Value;
use tracing::warn;

use crate::models::course::single_blank_point;
use crate::models::{Course, LearningPoint};
use crate::store::RawRecord;

use super::{FieldAlias, entries, lookup, millis, string_list, text};

pub const COURSE_FIELDS: &[FieldAlias] = &[
    FieldAlias::new("title", &["title"]),
    FieldAlias::new("ageRange", &["ageRange"]),
    FieldAlias::new("thumbnailUrl", &["thumbnailUrl"]),
    FieldAlias::new("shortDescription", &["shortDescription"]),
    FieldAlias::new("whatYouWillLearn", &["whatYouWillLearn"]),
    FieldAlias::new("learningOutcomes", &["learningOutcomes"]),
    FieldAlias::new("duration", &["duration"]),
    FieldAlias::new("schedule", &["schedule"]),
    FieldAlias::new("sessionLength", &["sessionLength"]),
    FieldAlias::new("prerequisites", &["prerequisites"]),
    FieldAlias::new("createdAt", &["createdAt"]),
    FieldAlias::new("updatedAt", &["updatedAt"]),
];

pub fn normalize_courses(snapshot: Option<&RawRecord>) -> Vec<Course> {
    let Some(records) = snapshot else {
        return Vec::new();
    };
    records
        .iter()
        .map(|(id, value)| normalize_course(id, value))
        .collect()
}

pub fn normalize_course(id: &str, value: &Value) -> Course {
    let empty = RawRecord::new();
    let raw = match value.as_object() {
        Some(map) => map,
        None => {
            warn!("course {} is not an object, using defaults", id);
            &empty
        }
    };
    let field = |canonical: &str| lookup(COURSE_FIELDS, canonical, raw);

    Course {
        id: id.to_string(),
        title: text(field("title")),
        age_range: text(field("ageRange")),
        thumbnail_url: text(field("thumbnailUrl")),
        short_description: text(field("shortDescription")),
        what_you_will_learn: entries(field("whatYouWillLearn"))
            .into_iter()
            .filter_map(learning_point)
            .collect(),
        learning_outcomes: text(field("learningOutcomes")),
        duration: text(field("duration")),
        schedule: text(field("schedule")),
        session_length: text(field("sessionLength")),
        prerequisites: text(field("prerequisites")),
        created_at: millis(field("createdAt")),
        updated_at: millis(field("updatedAt")),
    }
}

fn learning_point(value: &Value) -> Option<LearningPoint> {
    let raw = value.as_object()?;
    let mut subtopic_points = string_list(raw.get("subtopicPoints"));
    if subtopic_points.is_empty() {
        subtopic_points = single_blank_point();
    }

    Some(LearningPoint {
        title: text(raw.get("title")),
        description: text(raw.get("description")),
        subtopic_title: text(raw.get("subtopicTitle")),
        subtopic_points,
    })
}
