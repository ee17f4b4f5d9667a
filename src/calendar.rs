use crate::model::Event;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CalendarError {
    #[error("month index out of range: {0}")]
    InvalidMonth(u32),
    #[error("year out of range: {0}")]
    InvalidYear(i32),
}

/// One month laid out for a Sunday-first grid.
#[derive(Debug, Serialize)]
pub struct MonthGrid<'e> {
    pub year: i32,
    /// Zero-based.
    pub month: u32,
    /// Blank cells before the first of the month (weekday of the 1st, 0 = Sunday).
    pub leading_blanks: u32,
    pub days_in_month: u32,
    pub days: BTreeMap<u32, Vec<&'e Event>>,
}

impl<'e> MonthGrid<'e> {
    pub fn events_on(&self, day: u32) -> &[&'e Event] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Grid rows of seven cells; `None` marks padding.
    pub fn weeks(&self) -> Vec<Vec<Option<u32>>> {
        let cells: Vec<Option<u32>> = (0..self.leading_blanks)
            .map(|_| None)
            .chain((1..=self.days_in_month).map(Some))
            .collect();
        cells
            .chunks(7)
            .map(|week| {
                let mut week = week.to_vec();
                week.resize(7, None);
                week
            })
            .collect()
    }
}

pub fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CalendarError> {
    if month > 11 {
        return Err(CalendarError::InvalidMonth(month));
    }
    NaiveDate::from_ymd_opt(year, month + 1, 1).ok_or(CalendarError::InvalidYear(year))
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, CalendarError> {
    let first = first_of_month(year, month)?;
    let next = if month == 11 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 2, 1)
    }
    .ok_or(CalendarError::InvalidYear(year))?;
    Ok(next.signed_duration_since(first).num_days() as u32)
}

/// Previous and next (year, zero-based month) pairs.
pub fn adjacent_months(year: i32, month: u32) -> ((i32, u32), (i32, u32)) {
    let prev = if month == 0 { (year - 1, 11) } else { (year, month - 1) };
    let next = if month >= 11 { (year + 1, 0) } else { (year, month + 1) };
    (prev, next)
}

/// Buckets `events` into the days of the given month. Days are the UTC
/// calendar date of each release; every day of the month has an entry.
pub fn month_grid<'e, I>(year: i32, month: u32, events: I) -> Result<MonthGrid<'e>, CalendarError>
where
    I: IntoIterator<Item = &'e Event>,
{
    let first = first_of_month(year, month)?;
    let days_in_month = days_in_month(year, month)?;
    let mut days: BTreeMap<u32, Vec<&Event>> = (1..=days_in_month).map(|day| (day, Vec::new())).collect();
    for event in events {
        let date = event.release_date.naive_utc().date();
        if date.year() == year && date.month0() == month {
            if let Some(bucket) = days.get_mut(&date.day()) {
                bucket.push(event);
            }
        }
    }
    Ok(MonthGrid {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_sunday(),
        days_in_month,
        days,
    })
}

/// Consecutive runs of events sharing a release date, in input order.
pub fn group_by_day<'e, I>(events: I) -> Vec<(NaiveDate, Vec<&'e Event>)>
where
    I: IntoIterator<Item = &'e Event>,
{
    let mut ret: Vec<(NaiveDate, Vec<&Event>)> = Vec::new();
    for event in events {
        let date = event.release_date.naive_utc().date();
        match ret.last_mut() {
            Some((last, bucket)) if *last == date => bucket.push(event),
            _ => ret.push((date, vec![event])),
        }
    }
    ret
}
