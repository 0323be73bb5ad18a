//! Week keys.
//!
//! Tasks are grouped by the Monday that starts their week, written as
//! `YYYY-MM-DD`. Sunday belongs to the week that started six days earlier.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::error::{Error, Result};

const KEY_FORMAT: &str = "%Y-%m-%d";

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(offset)
}

pub fn week_key(date: NaiveDate) -> String {
    week_start(date).format(KEY_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), KEY_FORMAT)
        .map_err(|err| Error::InvalidWeek(format!("'{raw}': {err} (expected YYYY-MM-DD)")))
}

/// Parse any `YYYY-MM-DD` date and normalise it to its week key.
pub fn parse_week(raw: &str) -> Result<String> {
    parse_date(raw).map(week_key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekInfo {
    pub key: String,
    /// e.g. `Oct 13 – Oct 19`
    pub range: String,
    pub is_current: bool,
}

impl WeekInfo {
    /// The week `offset` weeks away from the one containing `today`.
    pub fn for_offset(today: NaiveDate, offset: i64) -> Self {
        let monday = week_start(today) + Duration::weeks(offset);
        Self::from_monday(monday, offset == 0)
    }

    /// The week containing `date`, relative to `today`.
    pub fn containing(date: NaiveDate, today: NaiveDate) -> Self {
        let monday = week_start(date);
        Self::from_monday(monday, monday == week_start(today))
    }

    fn from_monday(monday: NaiveDate, is_current: bool) -> Self {
        let sunday = monday + Duration::days(6);
        Self {
            key: monday.format(KEY_FORMAT).to_string(),
            range: format!("{} – {}", short_date(monday), short_date(sunday)),
            is_current,
        }
    }

    /// Header text: "This Week" for the current week, else the range.
    pub fn label(&self) -> &str {
        if self.is_current {
            "This Week"
        } else {
            &self.range
        }
    }
}

fn short_date(date: NaiveDate) -> String {
    format!("{} {}", date.format("%b"), date.day())
}
