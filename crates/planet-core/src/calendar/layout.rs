//! Month grid and completion helpers

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};

use crate::models::CalendarEvent;
use crate::{Error, Result};

/// First day of the month and first day of the following month
pub fn month_window(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return Err(Error::validation(format!("month must be between 1 and 12, got {}", month)));
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::validation(format!("invalid year: {}", year)))?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| Error::validation(format!("invalid year: {}", year)))?;
    Ok((start, end))
}

/// The given day and the day after it
pub fn day_window(date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let end = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| Error::validation(format!("date out of range: {}", date)))?;
    Ok((date, end))
}

/// Six week rows of day numbers, Sunday first; 0 marks an empty cell
pub fn month_layout(year: i32, month: u32) -> Result<[[u32; 7]; 6]> {
    let (start, end) = month_window(year, month)?;
    let days_in_month = (end - start).num_days() as u32;
    let offset = start.weekday().num_days_from_sunday();

    let mut grid = [[0u32; 7]; 6];
    for day in 1..=days_in_month {
        let cell = offset + day - 1;
        grid[(cell / 7) as usize][(cell % 7) as usize] = day;
    }
    Ok(grid)
}

/// Completion percentage per day of month, keyed by each event's start day
///
/// Todos of every event starting on the same day are pooled; a day whose
/// events have no todos at all counts as 100.
pub fn completion_by_day(events: &[CalendarEvent]) -> BTreeMap<u32, u32> {
    let mut totals: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for event in events {
        let entry = totals.entry(event.start_at.day()).or_default();
        entry.0 += event.todos().iter().filter(|t| t.is_done).count();
        entry.1 += event.todos().len();
    }

    totals
        .into_iter()
        .map(|(day, (done, total))| {
            let percent = if total == 0 { 100 } else { (done * 100 / total) as u32 };
            (day, percent)
        })
        .collect()
}

/// Every (year, month) touched by `[start, end]`
pub(crate) fn months_spanned(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = vec![(start.year(), start.month())];
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) < (end.year(), end.month()) {
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
        months.push((year, month));
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Todo, Visibility};
    use chrono::Utc;
    use uuid::Uuid;

    fn event_on(day: u32, done: &[bool]) -> CalendarEvent {
        let date = NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        let now = Utc::now();
        let id = Uuid::new_v4();
        let todos = done
            .iter()
            .map(|&is_done| Todo {
                id: Uuid::new_v4(),
                calendar_event_id: id,
                content: "t".to_string(),
                is_done,
                due_time: None,
                created_at: now,
                updated_at: now,
            })
            .collect();
        CalendarEvent {
            id,
            user_id: Uuid::new_v4(),
            title: "e".to_string(),
            description: String::new(),
            emoji: String::new(),
            start_at: date,
            end_at: date,
            visibility: Visibility::Public,
            image_url: None,
            created_at: now,
            updated_at: now,
            todos: Some(todos),
        }
    }

    #[test]
    fn test_month_starting_on_sunday() {
        // January 2023 starts on a Sunday
        let grid = month_layout(2023, 1).unwrap();
        assert_eq!(grid[0], [1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(grid[4], [29, 30, 31, 0, 0, 0, 0]);
        assert_eq!(grid[5], [0; 7]);
    }

    #[test]
    fn test_month_row_usage() {
        // March 2025 starts on a Saturday and spills into the sixth row
        let grid = month_layout(2025, 3).unwrap();
        assert_eq!(grid[0], [0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(grid[5], [30, 31, 0, 0, 0, 0, 0]);

        // July 2021 ends on a Saturday
        let grid = month_layout(2021, 7).unwrap();
        assert_eq!(grid[0], [0, 0, 0, 0, 1, 2, 3]);
        assert_eq!(grid[4], [25, 26, 27, 28, 29, 30, 31]);
        assert_eq!(grid[5], [0; 7]);
    }

    #[test]
    fn test_leap_february() {
        let grid = month_layout(2024, 2).unwrap();
        let days: Vec<u32> = grid.iter().flatten().copied().filter(|&d| d > 0).collect();
        assert_eq!(days.len(), 29);
    }

    #[test]
    fn test_invalid_month() {
        assert!(matches!(month_window(2025, 0), Err(Error::Validation(_))));
        assert!(matches!(month_window(2025, 13), Err(Error::Validation(_))));
        let (start, end) = month_window(2025, 12).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn test_completion_by_day() {
        let events = vec![
            event_on(3, &[]),
            event_on(5, &[true, false, false]),
            event_on(7, &[true]),
            event_on(7, &[false]),
        ];
        let completion = completion_by_day(&events);
        assert_eq!(completion.get(&3), Some(&100));
        assert_eq!(completion.get(&5), Some(&33));
        assert_eq!(completion.get(&7), Some(&50));
        assert_eq!(completion.len(), 3);
    }

    #[test]
    fn test_months_spanned() {
        let start = NaiveDate::from_ymd_opt(2024, 11, 20).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        assert_eq!(months_spanned(start, end), vec![(2024, 11), (2024, 12), (2025, 1)]);
        assert_eq!(months_spanned(start, start), vec![(2024, 11)]);
    }
}
