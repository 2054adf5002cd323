//! Extraction of the caller's own bookings from the booking-list page.
//!
//! Each booking is marked by a fixed arrow icon. The record itself is spread
//! over three places: a client-side navigation URL in the parent cell's
//! `onmousedown` attribute (group, pass number and date as query parameters),
//! a free-text `HH:MM - HH:MM` range in the row below, and the icon itself.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::form_urlencoded;

use super::{active_table, instants_on, range_from_captures, sel, text_of, ERROR_BANNER};
use crate::error::{Error, Result};
use crate::models::{Status, TimeRange, TimeSlot};

/// Arrow icon that marks exactly one booking belonging to the current user.
static OWN_MARKER: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"img[src="Images/pil2_right.gif"]"#));

static SPAN: LazyLock<Selector> = LazyLock::new(|| sel("span"));

/// The one navigation pattern the markup uses: a `javascript:` pseudo-URL
/// assigning a single-quoted target to `location.href`. Deliberately not a
/// script interpreter — anything else is a mismatch.
static NAV_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*javascript\s*:.*location\s*\.\s*href\s*=\s*'(.*)'\s*$")
        .expect("pattern is statically valid")
});

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{2}):(\d{2})\s*-\s*(\d{2}):(\d{2})\s*$").expect("pattern is statically valid")
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("pattern is statically valid"));

/// Extract the caller's own bookings, in document order.
///
/// An empty result means the page lists no bookings, which is not an error.
pub fn parse_bookings(html: &str) -> Result<Vec<TimeSlot>> {
    let doc = Html::parse_document(html);
    let table = active_table(&doc)?;
    if let Some(banner) = table.select(&ERROR_BANNER).next() {
        return Err(Error::Upstream(text_of(banner).trim().to_string()));
    }
    table.select(&OWN_MARKER).map(own_entry).collect()
}

fn own_entry(marker: ElementRef<'_>) -> Result<TimeSlot> {
    let cell = marker
        .parent()
        .and_then(ElementRef::wrap)
        .ok_or_else(|| Error::Markup("booking marker has no parent element".into()))?;
    let nav = cell
        .value()
        .attr("onmousedown")
        .ok_or_else(|| Error::Markup("cannot find navigation attribute for booking entry".into()))?;
    let target = NAV_HREF
        .captures(nav)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::Markup("cannot decode navigation target for booking entry".into()))?;
    let range = entry_time_range(cell)?;
    slot_from_target(&target, range)
}

/// The time range lives in free text in the row after the entry's own row.
fn entry_time_range(cell: ElementRef<'_>) -> Result<TimeRange> {
    let row = cell
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "tr")
        .ok_or_else(|| Error::Markup("booking entry is not inside a table row".into()))?;
    let next_row = row
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .next()
        .ok_or_else(|| Error::Markup("cannot find time range for booking entry".into()))?;
    next_row
        .select(&SPAN)
        .find_map(|span| {
            TIME_RANGE
                .captures(&text_of(span))
                .map(|caps| range_from_captures(&caps))
        })
        .ok_or_else(|| Error::Markup("cannot find time range for booking entry".into()))
}

fn slot_from_target(target: &str, range: TimeRange) -> Result<TimeSlot> {
    let query = target.split_once('?').map_or("", |(_, q)| q);
    let params: HashMap<String, String> =
        form_urlencoded::parse(query.as_bytes()).into_owned().collect();

    let group_id = positive_int(&params, "groupId")?;
    let pass_number = positive_int(&params, "passNumber")?;
    let date = params
        .get("date")
        .ok_or_else(|| Error::Markup("cannot find date in URL".into()))?;
    if !ISO_DATE.is_match(date) {
        return Err(Error::Markup("date is not a valid date".into()));
    }
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| Error::Markup("date is not a valid date".into()))?;

    let (start, end) = instants_on(date, range)?;
    Ok(TimeSlot {
        week: start.iso_week().into(),
        group_id,
        pass_number,
        start,
        end,
        status: Status::Own,
    })
}

fn positive_int(params: &HashMap<String, String>, key: &str) -> Result<u32> {
    let raw = params
        .get(key)
        .ok_or_else(|| Error::Markup(format!("cannot find {key} in URL")))?;
    let all_digits = !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit());
    match all_digits.then(|| raw.parse::<u32>().ok()).flatten() {
        Some(0) => Err(Error::Markup(format!("{key} must be a positive integer"))),
        Some(value) => Ok(value),
        None => Err(Error::Markup(format!("{key} is not a valid integer"))),
    }
}
