//! CLI argument definitions.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Bokbot - client for a legacy server-rendered booking system
#[derive(Parser, Debug)]
#[command(name = "bokbot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Emit results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the booking calendar for one week
    Week {
        /// Week offset relative to the session's landing week
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
    },
    /// List your own current bookings
    Bookings,
    /// Book a slot
    Book {
        #[arg(long)]
        group_id: u32,
        #[arg(long)]
        pass_number: u32,
        /// Slot date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Cancel a booking
    Unbook {
        #[arg(long)]
        group_id: u32,
        #[arg(long)]
        pass_number: u32,
        /// Slot date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Scan the coming weeks and book the first available slot
    Auto {
        /// How many weeks ahead to scan
        #[arg(long, default_value_t = 7)]
        weeks: i64,
    },
}
