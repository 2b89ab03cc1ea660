//! Calendar data source and free-block computation.
//!
//! The demo source generates a typical workday; a real calendar backend
//! would slot in behind the same trait.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use taskpilot_core::config::{parse_clock, WorkdayConfig};
use taskpilot_core::IntegrationError;

use crate::types::{CalendarEvent, FreeBlock};

/// Working-hour boundaries for free-block computation.
#[derive(Debug, Clone, Copy)]
pub struct Workday {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Gaps shorter than this are not worth reporting.
    pub min_block_minutes: i64,
}

impl Default for Workday {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            min_block_minutes: 15,
        }
    }
}

impl Workday {
    /// Build from configuration. Unparseable clock strings fall back to
    /// the defaults; `Config::validate` rejects them before this runs.
    pub fn from_config(config: &WorkdayConfig) -> Self {
        let defaults = Self::default();
        let clock = |s: &str, fallback: NaiveTime| {
            parse_clock(s)
                .and_then(|m| NaiveTime::from_hms_opt((m / 60) as u32, (m % 60) as u32, 0))
                .unwrap_or(fallback)
        };
        Self {
            start: clock(&config.start, defaults.start),
            end: clock(&config.end, defaults.end),
            min_block_minutes: config.min_block_minutes.max(1),
        }
    }
}

/// Source of calendar events for a given date.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn events_for(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, IntegrationError>;
}

/// Demo calendar generating a typical workday, empty on weekends.
pub struct DemoCalendar;

#[async_trait]
impl CalendarSource for DemoCalendar {
    async fn events_for(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, IntegrationError> {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Ok(Vec::new());
        }

        let at = |h: u32, m: u32| {
            date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default())
        };

        Ok(vec![
            CalendarEvent {
                id: "evt_001".to_string(),
                title: "Daily Standup - Phoenix Team".to_string(),
                start: at(9, 0),
                end: at(9, 15),
                duration_minutes: 15,
                attendees: vec![
                    "Sarah Chen".to_string(),
                    "Michael Rodriguez".to_string(),
                    "Team".to_string(),
                ],
            },
            CalendarEvent {
                id: "evt_002".to_string(),
                title: "Design Review - Payment Flow".to_string(),
                start: at(14, 0),
                end: at(15, 0),
                duration_minutes: 60,
                attendees: vec![
                    "Sarah Chen".to_string(),
                    "Jessica Wong".to_string(),
                    "Alex Kumar".to_string(),
                ],
            },
            CalendarEvent {
                id: "evt_003".to_string(),
                title: "1:1 with Sarah (Product Sync)".to_string(),
                start: at(16, 0),
                end: at(16, 30),
                duration_minutes: 30,
                attendees: vec!["Sarah Chen".to_string()],
            },
        ])
    }
}

/// Compute free blocks between events within working hours.
///
/// Blocks shorter than the workday's `min_block_minutes` are dropped.
/// Events are assumed to fall on `date`.
pub fn free_blocks(events: &[CalendarEvent], date: NaiveDate, workday: &Workday) -> Vec<FreeBlock> {
    let work_start = date.and_time(workday.start);
    let work_end = date.and_time(workday.end);

    let mut sorted: Vec<&CalendarEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.start);

    let mut blocks = Vec::new();
    let mut cursor = work_start;

    for event in sorted {
        if cursor < event.start {
            let gap = (event.start - cursor).num_minutes();
            if gap >= workday.min_block_minutes {
                blocks.push(FreeBlock {
                    start: cursor,
                    end: event.start,
                    duration_minutes: gap,
                });
            }
        }
        cursor = cursor.max(event.end);
    }

    if cursor < work_end {
        let gap = (work_end - cursor).num_minutes();
        if gap >= workday.min_block_minutes {
            blocks.push(FreeBlock {
                start: cursor,
                end: work_end,
                duration_minutes: gap,
            });
        }
    }

    blocks
}

/// Total meeting minutes for a day.
pub fn total_meeting_minutes(events: &[CalendarEvent]) -> i64 {
    events.iter().map(|e| e.duration_minutes).sum()
}
