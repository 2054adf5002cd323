//! High-level booking operations composed from the session and extractors.
//!
//! Each operation fetches one authenticated page and hands the body to the
//! matching extractor; there is no other coupling between the two layers.

use std::sync::Arc;

use chrono::NaiveDate;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{parse_bookings, parse_command, parse_week, CommandResponse};
use crate::models::TimeSlot;
use crate::session::{RequestOptions, Session, SessionParams};

pub struct Api {
    session: Session,
    config: Arc<Config>,
}

impl Api {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let session = Session::new(Arc::clone(&config))?;
        Ok(Self { session, config })
    }

    /// Fetch and decode the calendar `week_offset` weeks from the session's
    /// landing week.
    pub async fn fetch_week(&self, week_offset: i64) -> Result<Vec<TimeSlot>> {
        let mut url = self.config.homepage_url()?;
        url.query_pairs_mut()
            .append_pair("weekOffset", &week_offset.to_string());
        let body = self.fetch(url).await?;
        parse_week(&body)
    }

    /// Fetch and decode the caller's own booked times.
    pub async fn bookings(&self) -> Result<Vec<TimeSlot>> {
        let body = self.command_page("listBookings", &[]).await?;
        parse_bookings(&body)
    }

    /// Issue a named command with stringified arguments and decode the
    /// response page.
    pub async fn command(&self, name: &str, args: &[(&str, String)]) -> Result<CommandResponse> {
        let body = self.command_page(name, args).await?;
        parse_command(&body)
    }

    /// Book one slot.
    pub async fn book(
        &self,
        group_id: u32,
        pass_number: u32,
        date: NaiveDate,
    ) -> Result<CommandResponse> {
        self.command("book", &command_args(group_id, pass_number, date))
            .await
    }

    /// Cancel one booking.
    pub async fn unbook(
        &self,
        group_id: u32,
        pass_number: u32,
        date: NaiveDate,
    ) -> Result<CommandResponse> {
        self.command("unbook", &command_args(group_id, pass_number, date))
            .await
    }

    /// Book the given slot, as returned by [`Api::fetch_week`].
    pub async fn book_slot(&self, slot: &TimeSlot) -> Result<CommandResponse> {
        self.book(slot.group_id, slot.pass_number, slot.start.date_naive())
            .await
    }

    /// Close the underlying session, releasing its connection pool and
    /// cookie store.
    pub fn close(self) {
        self.session.close();
    }

    async fn command_page(&self, name: &str, args: &[(&str, String)]) -> Result<String> {
        let mut url = self.config.command_url()?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("command", name);
            for (key, value) in args {
                query.append_pair(key, value);
            }
        }
        let body = self.fetch(url).await?;
        Ok(body)
    }

    async fn fetch(&self, url: Url) -> Result<String> {
        let res = self
            .session
            .request(
                url,
                RequestOptions {
                    follow_redirects: false,
                    session_params: SessionParams::All,
                },
            )
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "unexpected status {status} from the booking page"
            )));
        }
        Ok(res.text().await?)
    }
}

/// The server wants the slot date as a midnight timestamp literal.
fn command_args(group_id: u32, pass_number: u32, date: NaiveDate) -> [(&'static str, String); 3] {
    [
        ("groupId", group_id.to_string()),
        ("date", format!("{date} 00:00:00")),
        ("passNumber", pass_number.to_string()),
    ]
}
