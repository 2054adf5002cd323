//! Time-slot records and their status vocabulary.

use chrono::{DateTime, IsoWeek, Utc};
use serde::{Deserialize, Serialize};

/// Availability of a slot, derived from the status icon the calendar shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    /// Booked by the current user.
    Own,
    /// Open for booking.
    Available,
    /// Will open for booking later.
    NotYetAvailable,
    /// Lies in the past.
    Expired,
    /// Booked by someone else.
    Taken,
}

impl Status {
    /// Map a status-icon `src` attribute to a status, keyed on the filename.
    ///
    /// Unknown filenames return `None`; callers treat that as a hard error
    /// rather than defaulting.
    pub fn from_icon(src: &str) -> Option<Self> {
        let filename = src.rsplit('/').next().unwrap_or(src);
        match filename {
            "icon_own.png" => Some(Self::Own),
            "icon_plus.png" => Some(Self::Available),
            "icon_plus_not.png" => Some(Self::NotYetAvailable),
            "icon_expired.png" => Some(Self::Expired),
            "icon_no.png" => Some(Self::Taken),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Available => "available",
            Self::NotYetAvailable => "not yet available",
            Self::Expired => "expired",
            Self::Taken => "taken",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wall-clock time of day, no date attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    pub hour: u32,
    pub minute: u32,
}

/// Start and end wall-clock times of one slot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Time,
    pub end: Time,
}

/// ISO-8601 (year, week) pair used as the booking-period key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub year: i32,
    pub week: u32,
}

impl From<IsoWeek> for Week {
    fn from(iso: IsoWeek) -> Self {
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

/// One bookable (or booked) slot recovered from the markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// ISO week of `start`.
    pub week: Week,
    /// Booking group the slot belongs to.
    pub group_id: u32,
    /// 1-based slot number within the day.
    pub pass_number: u32,
    /// Start instant, UTC.
    pub start: DateTime<Utc>,
    /// End instant, UTC. Always after `start`, on the same calendar date.
    pub end: DateTime<Utc>,
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_filenames_map_to_statuses() {
        assert_eq!(Status::from_icon("Images/icon_own.png"), Some(Status::Own));
        assert_eq!(
            Status::from_icon("images/icon_plus.png"),
            Some(Status::Available)
        );
        assert_eq!(
            Status::from_icon("icon_plus_not.png"),
            Some(Status::NotYetAvailable)
        );
        assert_eq!(
            Status::from_icon("Images/icon_expired.png"),
            Some(Status::Expired)
        );
        assert_eq!(Status::from_icon("Images/icon_no.png"), Some(Status::Taken));
    }

    #[test]
    fn unknown_icon_is_not_defaulted() {
        assert_eq!(Status::from_icon("Images/pil2_right.gif"), None);
        assert_eq!(Status::from_icon(""), None);
    }

    #[test]
    fn week_follows_iso_year_boundaries() {
        use chrono::{Datelike, NaiveDate};

        // 2024-12-30 is a Monday belonging to ISO week 1 of 2025.
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let week = Week::from(date.iso_week());
        assert_eq!(week, Week { year: 2025, week: 1 });
    }
}
