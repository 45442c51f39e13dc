use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::error::AppError;
use crate::models::Enrollment;

pub const HEADER: [&str; 12] = [
    "ID",
    "Child Name",
    "Parent Name",
    "Parent Email",
    "Course",
    "Status",
    "Submitted At",
    "Preferred Time",
    "Start Date",
    "Child Age",
    "Interests",
    "Notes",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
    pub rows: usize,
}

impl CsvExport {
    pub fn new(enrollments: &[&Enrollment], date: NaiveDate) -> Self {
        Self {
            file_name: file_name(date),
            contents: enrollments_csv(enrollments),
            rows: enrollments.len(),
        }
    }

    /// Writes the file into `dir`, creating it if needed, and returns the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, AppError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.contents)?;
        info!("exported {} enrollments to {}", self.rows, path.display());
        Ok(path)
    }
}

pub fn file_name(date: NaiveDate) -> String {
    format!("enrollments-{}.csv", date.format("%Y-%m-%d"))
}

pub fn enrollments_csv(enrollments: &[&Enrollment]) -> String {
    let mut lines = Vec::with_capacity(enrollments.len() + 1);
    lines.push(HEADER.join(","));

    for enrollment in enrollments {
        let row = [
            csv_quote(&enrollment.id),
            quoted(&enrollment.child_name),
            quoted(&enrollment.parent_name),
            csv_quote(&enrollment.parent_email),
            quoted(&enrollment.course),
            enrollment.status.to_string(),
            csv_quote(&enrollment.submitted_at.display_date()),
            quoted(&enrollment.preferred_time),
            csv_quote(&enrollment.start_date),
            csv_quote(&enrollment.child_age),
            quoted(&enrollment.interests.join(", ")),
            quoted(&enrollment.notes),
        ];
        lines.push(row.join(","));
    }

    lines.join("\n")
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        quoted(s)
    } else {
        s.to_string()
    }
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
