//! Pure derivations over the canonical enrollment list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Enrollment, EnrollmentStatus};

/// Tracked for display only. Filtering ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Last7Days,
    #[default]
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Last7Days => "7d",
            TimeRange::Last30Days => "30d",
            TimeRange::Last90Days => "90d",
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "7d" => Ok(TimeRange::Last7Days),
            "30d" => Ok(TimeRange::Last30Days),
            "90d" => Ok(TimeRange::Last90Days),
            other => Err(format!("unknown time range: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum CourseFilter {
    #[default]
    All,
    Id(String),
}

impl FromStr for CourseFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(CourseFilter::All),
            id => Ok(CourseFilter::Id(id.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(EnrollmentStatus),
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(StatusFilter::All),
            other => other.parse().map(StatusFilter::Only),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    pub search: String,
    pub course: CourseFilter,
    pub status: StatusFilter,
    pub time_range: TimeRange,
}

impl Filters {
    fn matches(&self, enrollment: &Enrollment, needle: &str) -> bool {
        let matches_search = [&enrollment.child_name, &enrollment.parent_name, &enrollment.id]
            .iter()
            .any(|field| field.to_lowercase().contains(needle));

        let matches_course = match &self.course {
            CourseFilter::All => true,
            CourseFilter::Id(id) => enrollment.course_id == *id,
        };

        let matches_status = match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => enrollment.status == status,
        };

        matches_search && matches_course && matches_status
    }
}

/// Search is a case-insensitive substring of child name, parent name or id;
/// course and status must match exactly unless set to `All`.
pub fn apply_filters<'a>(enrollments: &'a [Enrollment], filters: &Filters) -> Vec<&'a Enrollment> {
    let needle = filters.search.to_lowercase();
    enrollments
        .iter()
        .filter(|enrollment| filters.matches(enrollment, &needle))
        .collect()
}

/// The selected record if it survived filtering, else the first filtered one.
pub fn select_active<'a>(filtered: &[&'a Enrollment], selected_id: Option<&str>) -> Option<&'a Enrollment> {
    selected_id
        .and_then(|id| filtered.iter().find(|enrollment| enrollment.id == id))
        .or_else(|| filtered.first())
        .copied()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T: Clone> Page<&T> {
    pub fn cloned(self) -> Page<T> {
        Page {
            items: self.items.into_iter().cloned().collect(),
            page: self.page,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// One-based page of `items`. Out-of-range page numbers are clamped.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, page: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(items.len(), page_size);
    let page = clamp_page(page, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(items.len());

    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        page,
        total_pages,
        total_items: items.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EnrollmentStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub waitlisted: usize,
}

impl EnrollmentStats {
    pub fn cards(&self) -> Vec<StatCard> {
        vec![
            StatCard::new("Total Applications", self.total),
            StatCard::new("Pending Reviews", self.pending),
            StatCard::new("Approved Students", self.approved),
            StatCard::new("Waitlist", self.waitlisted),
        ]
    }
}

/// Counts over the filtered list, not the whole collection.
pub fn aggregate(filtered: &[&Enrollment]) -> EnrollmentStats {
    let count = |status: EnrollmentStatus| filtered.iter().filter(|e| e.status == status).count();
    EnrollmentStats {
        total: filtered.len(),
        pending: count(EnrollmentStatus::Pending),
        approved: count(EnrollmentStatus::Approved),
        waitlisted: count(EnrollmentStatus::Waitlisted),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: String,
}

impl StatCard {
    fn new(label: &'static str, count: usize) -> Self {
        Self {
            label,
            value: format!("{:02}", count),
        }
    }
}

impl fmt::Display for StatCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}
