//! HTML extraction for the booking site's fixed markup dialect.
//!
//! Three pure entry points, each taking one raw document:
//! [`parse_bookings`] for the caller's own booked times,
//! [`parse_week`] for the full week calendar, and
//! [`parse_command`] for the page a book/unbook command returns.
//!
//! None of them touch the network; they either return validated records or a
//! [`Markup`](crate::Error::Markup) error naming the expectation that failed.

mod bookings;
mod command;
mod week;

pub use bookings::parse_bookings;
pub use command::{parse_command, Action, CommandResponse, RejectionKind};
pub use week::{parse_week, parse_week_at};

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Captures;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::models::{Time, TimeRange};

/// The one "active" table every interesting page wraps its payload in.
static ACTIVE_TABLE: LazyLock<Selector> = LazyLock::new(|| sel(".bgActiveColor"));

/// The server's error banner, distinguished only by its text color.
static ERROR_BANNER: LazyLock<Selector> = LazyLock::new(|| sel(r##"[color="#FF4500"]"##));

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("selector is statically valid")
}

/// Concatenated text of an element's descendants.
fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// The single `.bgActiveColor` container, the primary signal that the page is
/// what we expected rather than an unauthenticated or unrelated view.
fn active_table(doc: &Html) -> Result<ElementRef<'_>> {
    let mut tables = doc.select(&ACTIVE_TABLE);
    match (tables.next(), tables.next()) {
        (Some(table), None) => Ok(table),
        _ => Err(Error::Markup("cannot find the active booking table".into())),
    }
}

/// Combine a calendar date with a wall-clock range into UTC instants.
fn instants_on(date: NaiveDate, range: TimeRange) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = instant_at(date, range.start)?;
    let end = instant_at(date, range.end)?;
    if start >= end {
        return Err(Error::Markup("time range ends before it starts".into()));
    }
    Ok((start, end))
}

fn instant_at(date: NaiveDate, time: Time) -> Result<DateTime<Utc>> {
    date.and_hms_opt(time.hour, time.minute, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            Error::Markup(format!(
                "{:02}:{:02} is not a valid time of day",
                time.hour, time.minute
            ))
        })
}

/// Build a time range from four captured digit pairs (start h/m, end h/m).
fn range_from_captures(caps: &Captures<'_>) -> TimeRange {
    let field = |i: usize| caps[i].parse::<u32>().expect("pattern captures digits");
    TimeRange {
        start: Time {
            hour: field(1),
            minute: field(2),
        },
        end: Time {
            hour: field(3),
            minute: field(4),
        },
    }
}
