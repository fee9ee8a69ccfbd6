/// Read-only aggregations over one user's tasks
///
/// All queries are scoped to the owner; tasks shared with the user are not
/// counted. Calendar days are UTC days.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::task::{Task, TaskCounts, TaskStatus};

/// Status counts, overdue count, and completion percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,

    /// Deadline strictly before today and not Completed
    pub overdue: i64,

    pub completion_percentage: i64,
}

/// Trailing window for trend reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendWindow {
    #[default]
    Week,
    Month,
}

impl TrendWindow {
    /// Number of calendar days covered, today inclusive
    pub fn days(&self) -> i64 {
        match self {
            TrendWindow::Week => 7,
            TrendWindow::Month => 30,
        }
    }

    /// Parses the `days` query parameter (absent = 7)
    ///
    /// # Example
    ///
    /// ```
    /// use taskdeck_shared::models::analytics::TrendWindow;
    ///
    /// assert_eq!(TrendWindow::parse(None).unwrap(), TrendWindow::Week);
    /// assert_eq!(TrendWindow::parse(Some("30")).unwrap(), TrendWindow::Month);
    /// assert!(TrendWindow::parse(Some("14")).is_err());
    /// ```
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") | Some("7") => Ok(TrendWindow::Week),
            Some("30") => Ok(TrendWindow::Month),
            Some(_) => Err("Days must be 7 or 30".to_string()),
        }
    }

    /// First day of the window ending on `today`
    pub fn start(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(self.days() - 1)
    }
}

/// Tasks created and completed on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub created: i64,
    pub completed: i64,
}

/// Share of tasks in one status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusShare {
    pub status: TaskStatus,
    pub count: i64,

    /// Percentage of all tasks, one decimal place
    pub percentage: f64,
}

/// Splits `counts` into per-status shares
pub fn distribution(counts: &TaskCounts) -> Vec<StatusShare> {
    TaskStatus::ALL
        .iter()
        .map(|&status| {
            let count = counts.for_status(status);
            StatusShare {
                status,
                count,
                percentage: percentage_one_decimal(count, counts.total),
            }
        })
        .collect()
}

fn percentage_one_decimal(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }

    (part as f64 / total as f64 * 1000.0).round() / 10.0
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    total: i64,
    pending: i64,
    in_progress: i64,
    completed: i64,
    overdue: i64,
}

/// Summarizes `owner`'s tasks as of `today`
pub async fn summary(
    pool: &PgPool,
    owner: Uuid,
    today: NaiveDate,
) -> Result<AnalyticsSummary, sqlx::Error> {
    let row = sqlx::query_as::<_, SummaryRow>(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE status = 'Pending') AS pending,
               COUNT(*) FILTER (WHERE status = 'In Progress') AS in_progress,
               COUNT(*) FILTER (WHERE status = 'Completed') AS completed,
               COUNT(*) FILTER (WHERE deadline < $2 AND status <> 'Completed') AS overdue
        FROM tasks
        WHERE user_id = $1
        "#,
    )
    .bind(owner)
    .bind(today)
    .fetch_one(pool)
    .await?;

    let counts = TaskCounts {
        total: row.total,
        pending: row.pending,
        in_progress: row.in_progress,
        completed: row.completed,
    };

    Ok(AnalyticsSummary {
        total: counts.total,
        pending: counts.pending,
        in_progress: counts.in_progress,
        completed: counts.completed,
        overdue: row.overdue,
        completion_percentage: counts.completion_percentage(),
    })
}

/// Per-day created/completed counts over `window`, oldest first
///
/// Every day in the window is present, including days with no activity.
pub async fn trends(
    pool: &PgPool,
    owner: Uuid,
    window: TrendWindow,
    today: NaiveDate,
) -> Result<Vec<TrendPoint>, sqlx::Error> {
    let points = sqlx::query_as::<_, TrendPoint>(
        r#"
        SELECT d.day::date AS date,
               COALESCE(c.created, 0) AS created,
               COALESCE(f.completed, 0) AS completed
        FROM generate_series($2::date, $3::date, INTERVAL '1 day') AS d(day)
        LEFT JOIN (
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS created
            FROM tasks
            WHERE user_id = $1
            GROUP BY 1
        ) c ON c.day = d.day::date
        LEFT JOIN (
            SELECT (completed_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS completed
            FROM tasks
            WHERE user_id = $1 AND completed_at IS NOT NULL
            GROUP BY 1
        ) f ON f.day = d.day::date
        ORDER BY 1 ASC
        "#,
    )
    .bind(owner)
    .bind(window.start(today))
    .bind(today)
    .fetch_all(pool)
    .await?;

    Ok(points)
}

/// Per-status distribution of `owner`'s tasks
pub async fn status_distribution(
    pool: &PgPool,
    owner: Uuid,
) -> Result<Vec<StatusShare>, sqlx::Error> {
    let counts = Task::count_by_status(pool, owner).await?;
    Ok(distribution(&counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_window_parse() {
        assert_eq!(TrendWindow::parse(None).unwrap(), TrendWindow::Week);
        assert_eq!(TrendWindow::parse(Some("7")).unwrap(), TrendWindow::Week);
        assert_eq!(TrendWindow::parse(Some("30")).unwrap(), TrendWindow::Month);
        assert!(TrendWindow::parse(Some("0")).is_err());
        assert!(TrendWindow::parse(Some("abc")).is_err());
    }

    #[test]
    fn test_trend_window_start_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(
            TrendWindow::Week.start(today),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
        assert_eq!(
            TrendWindow::Month.start(today),
            NaiveDate::from_ymd_opt(2025, 2, 9).unwrap()
        );
    }

    #[test]
    fn test_distribution_percentages() {
        let counts = TaskCounts {
            total: 3,
            pending: 1,
            in_progress: 1,
            completed: 1,
        };

        let shares = distribution(&counts);
        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0].status, TaskStatus::Pending);
        assert_eq!(shares[0].percentage, 33.3);
        assert_eq!(shares[2].count, 1);
    }

    #[test]
    fn test_distribution_empty() {
        let shares = distribution(&TaskCounts::default());
        assert!(shares.iter().all(|s| s.count == 0 && s.percentage == 0.0));
    }

    #[test]
    fn test_percentage_one_decimal() {
        assert_eq!(percentage_one_decimal(2, 3), 66.7);
        assert_eq!(percentage_one_decimal(1, 8), 12.5);
        assert_eq!(percentage_one_decimal(4, 4), 100.0);
    }
}
