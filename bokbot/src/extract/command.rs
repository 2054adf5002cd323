//! Decoding of the page a book/unbook command returns.
//!
//! The server answers commands with a rendered page rather than a status
//! code: a title like "Bokning utförd:" on success, or the error banner with
//! one of a handful of fixed sentences on rejection. Both are mapped to a
//! structured response; rejection is a value here, not an `Err`, because the
//! page arrived exactly as expected.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};

use super::{active_table, sel, text_of, ERROR_BANNER};
use crate::error::{Error, Result};

static COMMAND_TITLE: LazyLock<scraper::Selector> =
    LazyLock::new(|| sel(".bigText.headerColor"));

static COMMAND_DONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.*)\s+utförd:\s*$").expect("pattern is statically valid"));

/// What the server says it carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Booking,
    Unbooking,
    /// The title matched the success shape but named an unfamiliar action;
    /// the raw text is preserved alongside.
    Unknown,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Unbooking => "unbooking",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the server declined a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectionKind {
    /// The account's quota of future bookings is used up.
    MaxFutureBookings,
    /// Unbooking a pass that has already started.
    AlreadyStarted,
    /// The slot is expired, not yet open, or taken; the server is no more
    /// specific than an index-out-of-range complaint.
    InvalidSlot,
    Unknown,
}

impl RejectionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxFutureBookings => "max future bookings reached",
            Self::AlreadyStarted => "already started",
            Self::InvalidSlot => "invalid slot",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a book/unbook command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CommandResponse {
    Success {
        action: Action,
        raw_action: String,
    },
    Rejected {
        kind: RejectionKind,
        message: String,
        raw_message: String,
    },
}

const MAX_REACHED_TEXT: &str = "max antal framtida bokningar överskridet.";
const ALREADY_STARTED_TEXT: &str = "inte tillåtet att avboka ett startat pass.";
const INVALID_SLOT_TEXT: &str =
    "specified argument was out of the range of valid values.\nparameter name: index";

const MAX_REACHED_MESSAGE: &str = "Maximum number of simultaneous bookings reached.";
const ALREADY_STARTED_MESSAGE: &str = "You cannot unbook a time that has already started.";
const INVALID_SLOT_MESSAGE: &str =
    "Invalid timeslot. It could be expired, not yet available or already taken.";

/// Decode the command response page.
pub fn parse_command(html: &str) -> Result<CommandResponse> {
    let doc = Html::parse_document(html);
    let table = active_table(&doc)?;

    if let Some(title) = table.select(&COMMAND_TITLE).next() {
        if let Some(caps) = COMMAND_DONE.captures(&text_of(title)) {
            let raw_action = caps[1].trim().to_string();
            let action = match raw_action.to_lowercase().as_str() {
                "bokning" => Action::Booking,
                "avbokning" => Action::Unbooking,
                _ => Action::Unknown,
            };
            return Ok(CommandResponse::Success { action, raw_action });
        }
    }
    rejection(&doc)
}

fn rejection(doc: &Html) -> Result<CommandResponse> {
    let table = active_table(doc)?;
    let banner = table
        .select(&ERROR_BANNER)
        .next()
        .ok_or_else(|| Error::Markup("cannot find the command error banner".into()))?;
    let raw_message = text_of(banner).trim().to_string();
    let (kind, message) = match raw_message.to_lowercase().as_str() {
        MAX_REACHED_TEXT => (RejectionKind::MaxFutureBookings, MAX_REACHED_MESSAGE.to_string()),
        ALREADY_STARTED_TEXT => {
            (RejectionKind::AlreadyStarted, ALREADY_STARTED_MESSAGE.to_string())
        }
        INVALID_SLOT_TEXT => (RejectionKind::InvalidSlot, INVALID_SLOT_MESSAGE.to_string()),
        _ => (
            RejectionKind::Unknown,
            format!("Unknown Error: {raw_message}"),
        ),
    };
    Ok(CommandResponse::Rejected {
        kind,
        message,
        raw_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!(r#"<html><body><table class="bgActiveColor">{body}</table></body></html>"#)
    }

    fn title_page(title: &str) -> String {
        page(&format!(
            r#"<tr><td><span class="bigText headerColor">{title}</span></td></tr>"#
        ))
    }

    fn banner_page(text: &str) -> String {
        page(&format!(
            r##"<tr><td><font color="#FF4500">{text}</font></td></tr>"##
        ))
    }

    #[test]
    fn booking_success_is_decoded() {
        let response = parse_command(&title_page("Bokning utförd:")).unwrap();
        assert_eq!(
            response,
            CommandResponse::Success {
                action: Action::Booking,
                raw_action: "Bokning".to_string(),
            }
        );
    }

    #[test]
    fn unbooking_success_is_decoded() {
        let response = parse_command(&title_page(" Avbokning   utförd: ")).unwrap();
        assert_eq!(
            response,
            CommandResponse::Success {
                action: Action::Unbooking,
                raw_action: "Avbokning".to_string(),
            }
        );
    }

    #[test]
    fn unfamiliar_action_is_preserved() {
        let response = parse_command(&title_page("Ombokning utförd:")).unwrap();
        assert_eq!(
            response,
            CommandResponse::Success {
                action: Action::Unknown,
                raw_action: "Ombokning".to_string(),
            }
        );
    }

    #[test]
    fn known_rejections_map_to_kinds() {
        let cases = [
            (
                "Max antal framtida bokningar överskridet.",
                RejectionKind::MaxFutureBookings,
            ),
            (
                "Inte tillåtet att avboka ett startat pass.",
                RejectionKind::AlreadyStarted,
            ),
            (
                "Specified argument was out of the range of valid values.\nParameter name: index",
                RejectionKind::InvalidSlot,
            ),
        ];
        for (text, expected) in cases {
            let response = parse_command(&banner_page(text)).unwrap();
            let CommandResponse::Rejected { kind, raw_message, .. } = response else {
                panic!("expected a rejection for {text:?}");
            };
            assert_eq!(kind, expected, "{text:?}");
            assert_eq!(raw_message, text.trim());
        }
    }

    #[test]
    fn unknown_rejection_keeps_the_banner_text() {
        let response = parse_command(&banner_page("Ett helt nytt fel.")).unwrap();
        assert_eq!(
            response,
            CommandResponse::Rejected {
                kind: RejectionKind::Unknown,
                message: "Unknown Error: Ett helt nytt fel.".to_string(),
                raw_message: "Ett helt nytt fel.".to_string(),
            }
        );
    }

    #[test]
    fn missing_table_is_a_mismatch() {
        let err = parse_command("<html><body><p>nope</p></body></html>").unwrap_err();
        assert!(matches!(err, Error::Markup(_)), "got {err:?}");
    }

    #[test]
    fn page_with_neither_title_nor_banner_is_a_mismatch() {
        let err = parse_command(&page("<tr><td>hello</td></tr>")).unwrap_err();
        assert!(
            matches!(err, Error::Markup(ref msg) if msg.contains("banner")),
            "got {err:?}"
        );
    }
}
