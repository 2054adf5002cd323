//! Extraction of the full week calendar from the homepage view.
//!
//! The page shows one week as seven icon columns over a shared list of time
//! rows. The header names only a week number ("vecka 11"), so the year is
//! resolved against today's ISO week; the seven day-header cells carry `D/M`
//! dates that double-check the resolution.

use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{instants_on, range_from_captures, sel, text_of};
use crate::error::{Error, Result};
use crate::models::{Status, TimeRange, TimeSlot, Week};

static SELECTED_GROUP: LazyLock<Selector> =
    LazyLock::new(|| sel("#ddBookingGroup > option[selected]"));

static WEEK_CELL: LazyLock<Selector> = LazyLock::new(|| sel(".BookingCalendarCurrentWeekCell"));

static TIME_TABLE: LazyLock<Selector> =
    LazyLock::new(|| sel(".calendarTimeRowOuterTdInnerTable"));

static BOOKING_COLUMN: LazyLock<Selector> =
    LazyLock::new(|| sel(".BookingCalendarBookingIconsOuterCellInnerTable"));

static ROW: LazyLock<Selector> = LazyLock::new(|| sel("tr"));

static IMG: LazyLock<Selector> = LazyLock::new(|| sel("img"));

static WEEK_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vecka\s*(\d+)").expect("pattern is statically valid"));

static DAY_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d])(\d{1,2}/\d{1,2})(?:$|[^\d])").expect("pattern is statically valid")
});

static ROW_TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d])(\d{2}):(\d{2})\s*-\s*(\d{2}):(\d{2})(?:$|[^\d])")
        .expect("pattern is statically valid")
});

/// Extract every slot of the displayed week, column by column (day by day).
pub fn parse_week(html: &str) -> Result<Vec<TimeSlot>> {
    parse_week_at(html, Utc::now().date_naive())
}

/// Like [`parse_week`], with the reference date made explicit so the week
/// number → year resolution is deterministic.
pub fn parse_week_at(html: &str, today: NaiveDate) -> Result<Vec<TimeSlot>> {
    let doc = Html::parse_document(html);
    let group_id = selected_group(&doc)?;
    let (week, dates) = week_dates(&doc, today)?;
    let ranges = time_ranges(&doc)?;

    let columns: Vec<ElementRef<'_>> = doc.select(&BOOKING_COLUMN).collect();
    if columns.len() != dates.len() {
        return Err(Error::Markup(format!(
            "expected {} booking columns, got {}",
            dates.len(),
            columns.len()
        )));
    }

    let mut slots = Vec::new();
    for (date, column) in dates.iter().zip(&columns) {
        let icons: Vec<ElementRef<'_>> = column.select(&IMG).collect();
        if icons.len() != ranges.len() {
            return Err(Error::Markup(format!(
                "expected {} status icons in a booking column, got {}",
                ranges.len(),
                icons.len()
            )));
        }
        for (slot_index, icon) in icons.iter().enumerate() {
            let src = icon
                .value()
                .attr("src")
                .ok_or_else(|| Error::Markup("status icon without a src attribute".into()))?;
            let status = Status::from_icon(src)
                .ok_or_else(|| Error::Markup(format!("unknown status icon {src:?}")))?;
            let (start, end) = instants_on(*date, ranges[slot_index])?;
            slots.push(TimeSlot {
                week,
                group_id,
                pass_number: slot_index as u32 + 1,
                start,
                end,
                status,
            });
        }
    }
    Ok(slots)
}

fn selected_group(doc: &Html) -> Result<u32> {
    let mut options = doc.select(&SELECTED_GROUP);
    let (Some(option), None) = (options.next(), options.next()) else {
        return Err(Error::Markup(
            "cannot determine the selected booking group".into(),
        ));
    };
    let value = option
        .value()
        .attr("value")
        .ok_or_else(|| Error::Markup("selected booking group has no value".into()))?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Markup(
            "booking group id is not a well-formed number".into(),
        ));
    }
    value
        .parse()
        .map_err(|_| Error::Markup("booking group id is not a well-formed number".into()))
}

fn week_dates(doc: &Html, today: NaiveDate) -> Result<(Week, [NaiveDate; 7])> {
    let cell = doc
        .select(&WEEK_CELL)
        .next()
        .ok_or_else(|| Error::Markup("cannot find the current week header cell".into()))?;
    let text = text_of(cell);
    let caps = WEEK_LABEL
        .captures(&text)
        .ok_or_else(|| Error::Markup("cannot decode the week number header".into()))?;
    let week_no: u32 = caps[1]
        .parse()
        .map_err(|_| Error::Markup("week number header is out of range".into()))?;

    let year = target_year(today.iso_week().year(), today.iso_week().week(), week_no);
    let monday = NaiveDate::from_isoywd_opt(year, week_no, Weekday::Mon)
        .ok_or_else(|| Error::Markup(format!("week {week_no} does not exist in {year}")))?;
    let dates: [NaiveDate; 7] = std::array::from_fn(|i| monday + Days::new(i as u64));

    // The seven cells after the week header carry D/M dates; they must agree
    // with the resolved week or the year guess was wrong.
    let mut day_cells = cell.next_siblings().filter_map(ElementRef::wrap);
    for date in &dates {
        let day_cell = day_cells
            .next()
            .ok_or_else(|| Error::Markup("cannot find a weekday header cell".into()))?;
        let text = text_of(day_cell);
        let caps = DAY_LABEL.captures(&text).ok_or_else(|| {
            Error::Markup("cannot find the date segment of a weekday header".into())
        })?;
        let expected = format!("{}/{}", date.day(), date.month());
        if &caps[1] != expected {
            return Err(Error::Markup(format!(
                "weekday header mismatch, expected {expected:?}, got {:?}",
                &caps[1]
            )));
        }
    }
    Ok((Week { year, week: week_no }, dates))
}

fn time_ranges(doc: &Html) -> Result<Vec<TimeRange>> {
    let table = doc
        .select(&TIME_TABLE)
        .next()
        .ok_or_else(|| Error::Markup("cannot find the time-slot row table".into()))?;
    let mut ranges = Vec::new();
    for row in table.select(&ROW) {
        let text = text_of(row);
        let caps = ROW_TIME_RANGE
            .captures(&text)
            .ok_or_else(|| Error::Markup("cannot find the time range of a slot row".into()))?;
        ranges.push(range_from_captures(&caps));
    }
    if ranges.is_empty() {
        return Err(Error::Markup("the time-slot table has no rows".into()));
    }
    Ok(ranges)
}

fn circular_mod(q: i64, p: i64) -> i64 {
    if q < 0 {
        p + (q % p)
    } else {
        q % p
    }
}

/// Resolve which year a bare week number refers to, given today's ISO week.
/// A week within half a year ahead of today stays in (or rolls into) the
/// nearby year; anything further wraps the other way.
fn target_year(this_year: i32, this_week: u32, target_week: u32) -> i32 {
    if this_week == target_week {
        return this_year;
    }
    let adjusted = circular_mod(i64::from(target_week) - i64::from(this_week), 53) - 26;
    match adjusted.signum() {
        1 => {
            if this_week > target_week {
                this_year
            } else {
                this_year - 1
            }
        }
        -1 => {
            if this_week < target_week {
                this_year
            } else {
                this_year + 1
            }
        }
        _ => this_year,
    }
}
