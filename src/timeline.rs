//! Time axis for the equipment schedule.
//!
//! Instants are naive wall-clock timestamps; no timezone is attached to them
//! anywhere in the crate.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use tracing::debug;

use crate::models::Equipment;

/// Resolves a stored date (and optional hour) to an instant.
///
/// A date carrying its own time part (`2024-01-01T08:00`) is used as is; a
/// bare date needs an hour (`08:00`) to become an instant. Anything else
/// yields `None` and the field is ignored.
pub fn resolve_instant(date: Option<&str>, hour: Option<&str>) -> Option<NaiveDateTime> {
    let date = date?.trim();
    if date.is_empty() {
        return None;
    }

    if date.contains('T') {
        let parsed = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M"))
            .or_else(|_| {
                DateTime::parse_from_str(date, "%Y-%m-%dT%H:%M%#z").map(|dt| dt.naive_local())
            })
            .or_else(|_| {
                let local = date.strip_suffix('Z').unwrap_or(date);
                NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M")
            })
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(date).ok().map(|dt| dt.naive_local()));
        if parsed.is_none() {
            debug!(date, "unreadable timestamp ignored");
        }
        return parsed;
    }

    let hour = hour?.trim();
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(hour, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(hour, "%H:%M"))
        .ok()?;
    Some(day.and_time(time))
}

pub fn pose_instant(equipment: &Equipment) -> Option<NaiveDateTime> {
    resolve_instant(equipment.date_pose.as_deref(), equipment.hour_pose.as_deref())
}

pub fn depose_instant(equipment: &Equipment) -> Option<NaiveDateTime> {
    resolve_instant(equipment.date_depose.as_deref(), equipment.hour_depose.as_deref())
}

fn floor_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    t.date().and_hms_opt(t.hour(), 0, 0).unwrap_or(t)
}

/// Tick spacing for a given span.
pub fn smart_interval(total: Duration) -> Duration {
    if total <= Duration::hours(24) {
        Duration::hours(1)
    } else if total <= Duration::days(3) {
        Duration::hours(4)
    } else if total <= Duration::days(7) {
        Duration::hours(12)
    } else {
        Duration::hours(24)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub total: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayBlock {
    pub date: NaiveDate,
    pub label: String,
    pub left_percent: f64,
    pub width_percent: f64,
    pub is_weekend: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourTick {
    pub at: NaiveDateTime,
    pub percent: f64,
    pub label: String,
    /// Midnight tick.
    pub is_major: bool,
    pub show_label: bool,
}

impl TimeBounds {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> TimeBounds {
        TimeBounds {
            start,
            end,
            total: end - start,
        }
    }

    /// Bounds enclosing every resolvable pose/depose instant, widened to whole
    /// hours with one hour of margin before and two after. Without any
    /// instant the axis covers the 24 hours following `now`.
    pub fn compute(equipment: &[Equipment], now: NaiveDateTime) -> TimeBounds {
        let instants = equipment
            .iter()
            .flat_map(|eq| [pose_instant(eq), depose_instant(eq)])
            .flatten();

        let mut range: Option<(NaiveDateTime, NaiveDateTime)> = None;
        for t in instants {
            range = Some(match range {
                None => (t, t),
                Some((lo, hi)) => (lo.min(t), hi.max(t)),
            });
        }

        match range {
            None => {
                let start = floor_to_hour(now);
                TimeBounds::new(start, start + Duration::hours(24))
            }
            Some((min, max)) => TimeBounds::new(
                floor_to_hour(min) - Duration::hours(1),
                floor_to_hour(max) + Duration::hours(2),
            ),
        }
    }

    fn total_ms(&self) -> f64 {
        self.total.num_milliseconds() as f64
    }

    fn percent_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> f64 {
        (to - from).num_milliseconds() as f64 / self.total_ms() * 100.0
    }

    /// Position of `instant` on the axis, in percent, clamped to `[0, 100]`.
    pub fn position_of(&self, instant: NaiveDateTime) -> f64 {
        if self.total_ms() <= 0.0 {
            return 0.0;
        }
        self.percent_between(self.start, instant).clamp(0.0, 100.0)
    }

    pub fn percent_to_instant(&self, percent: f64) -> NaiveDateTime {
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        let offset = (self.total_ms() * percent / 100.0).round() as i64;
        self.start + Duration::milliseconds(offset)
    }

    /// One block per calendar day overlapping the bounds, clipped to them.
    pub fn day_blocks(&self) -> Vec<DayBlock> {
        let mut blocks = Vec::new();
        if self.total_ms() <= 0.0 {
            return blocks;
        }

        let mut day = self.start.date();
        loop {
            let midnight = day.and_time(NaiveTime::MIN);
            if midnight >= self.end {
                break;
            }
            let next = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };

            let block_start = midnight.max(self.start);
            let block_end = next.and_time(NaiveTime::MIN).min(self.end);
            if block_start < block_end {
                blocks.push(DayBlock {
                    date: day,
                    label: day.format("%a %-d %b").to_string(),
                    left_percent: self.percent_between(self.start, block_start),
                    width_percent: self.percent_between(block_start, block_end),
                    is_weekend: matches!(day.weekday(), Weekday::Sat | Weekday::Sun),
                });
            }
            day = next;
        }
        blocks
    }

    /// Ticks at `smart_interval` spacing, aligned on interval boundaries.
    pub fn hour_ticks(&self) -> Vec<HourTick> {
        let mut ticks = Vec::new();
        if self.total_ms() <= 0.0 {
            return ticks;
        }

        let interval = smart_interval(self.total);
        let interval_ms = interval.num_milliseconds();
        let show_label = self.total < Duration::days(7);

        let remainder = self.start.and_utc().timestamp_millis().rem_euclid(interval_ms);
        let mut current = if remainder == 0 {
            self.start
        } else {
            self.start + Duration::milliseconds(interval_ms - remainder)
        };

        while current <= self.end {
            ticks.push(HourTick {
                at: current,
                percent: self.percent_between(self.start, current),
                label: current.format("%H:%M").to_string(),
                is_major: current.hour() == 0 && current.minute() == 0,
                show_label,
            });
            current += interval;
        }
        ticks
    }
}

/// Pose and depose marker positions of one equipment row, in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMarkers {
    pub equipment_id: String,
    pub pose: Option<f64>,
    pub depose: Option<f64>,
}

/// The schedule axis plus its draggable cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    bounds: TimeBounds,
    cursor: NaiveDateTime,
}

impl Timeline {
    /// Builds the axis and opens the cursor on the earliest pose.
    pub fn new(equipment: &[Equipment], now: NaiveDateTime) -> Timeline {
        let bounds = TimeBounds::compute(equipment, now);
        let cursor = initial_cursor(equipment, &bounds);
        debug!(start = %bounds.start, end = %bounds.end, cursor = %cursor, "timeline bounds");
        Timeline { bounds, cursor }
    }

    pub fn from_equipment(equipment: &[Equipment]) -> Timeline {
        Timeline::new(equipment, Local::now().naive_local())
    }

    /// Recomputes the bounds after the equipment set changed. The cursor goes
    /// back to the earliest pose.
    pub fn recompute(&mut self, equipment: &[Equipment], now: NaiveDateTime) {
        *self = Timeline::new(equipment, now);
    }

    pub fn bounds(&self) -> &TimeBounds {
        &self.bounds
    }

    pub fn cursor(&self) -> NaiveDateTime {
        self.cursor
    }

    pub fn cursor_percent(&self) -> f64 {
        self.bounds.position_of(self.cursor)
    }

    pub fn set_cursor(&mut self, instant: NaiveDateTime) {
        self.cursor = instant.max(self.bounds.start).min(self.bounds.end);
    }

    pub fn set_cursor_percent(&mut self, percent: f64) {
        self.cursor = self.bounds.percent_to_instant(percent);
    }

    pub fn interval(&self) -> Duration {
        smart_interval(self.bounds.total)
    }

    pub fn day_blocks(&self) -> Vec<DayBlock> {
        self.bounds.day_blocks()
    }

    pub fn hour_ticks(&self) -> Vec<HourTick> {
        self.bounds.hour_ticks()
    }

    pub fn markers(&self, equipment: &Equipment) -> RowMarkers {
        RowMarkers {
            equipment_id: equipment.id.clone(),
            pose: pose_instant(equipment).map(|t| self.bounds.position_of(t)),
            depose: depose_instant(equipment).map(|t| self.bounds.position_of(t)),
        }
    }
}

fn initial_cursor(equipment: &[Equipment], bounds: &TimeBounds) -> NaiveDateTime {
    let earliest_pose = equipment.iter().filter_map(pose_instant).min();
    let earliest_any = || {
        equipment
            .iter()
            .flat_map(|eq| [pose_instant(eq), depose_instant(eq)])
            .flatten()
            .min()
    };
    earliest_pose
        .or_else(earliest_any)
        .unwrap_or(bounds.start)
        .max(bounds.start)
        .min(bounds.end)
}
