use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPoint {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub subtopic_title: String,
    #[serde(default = "single_blank_point")]
    pub subtopic_points: Vec<String>,
}

impl Default for LearningPoint {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            subtopic_title: String::new(),
            subtopic_points: single_blank_point(),
        }
    }
}

pub(crate) fn single_blank_point() -> Vec<String> {
    vec![String::new()]
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub age_range: String,
    pub thumbnail_url: String,
    pub short_description: String,
    pub what_you_will_learn: Vec<LearningPoint>,
    pub learning_outcomes: String,
    pub duration: String,
    pub schedule: String,
    pub session_length: String,
    pub prerequisites: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl Course {
    /// `learningOutcomes` is stored as one text block, one outcome per line.
    pub fn learning_outcome_lines(&self) -> Vec<&str> {
        self.learning_outcomes
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Course form contents sent on create/update. Timestamps are stamped by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub title: String,
    pub age_range: String,
    pub thumbnail_url: String,
    pub short_description: String,
    pub what_you_will_learn: Vec<LearningPoint>,
    pub learning_outcomes: String,
    pub duration: String,
    pub schedule: String,
    pub session_length: String,
    pub prerequisites: String,
}

impl CourseDraft {
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            age_range: course.age_range.clone(),
            thumbnail_url: course.thumbnail_url.clone(),
            short_description: course.short_description.clone(),
            what_you_will_learn: course.what_you_will_learn.clone(),
            learning_outcomes: course.learning_outcomes.clone(),
            duration: course.duration.clone(),
            schedule: course.schedule.clone(),
            session_length: course.session_length.clone(),
            prerequisites: course.prerequisites.clone(),
        }
    }

    pub fn to_payload(&self) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Ok(serde_json::Map::new()),
        }
    }
}
