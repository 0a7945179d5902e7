//! Per-weekday working-hours schedule

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

const TIME_FORMAT: &str = "%H:%M";

/// One weekday's shift, times as `HH:MM` in the deployment's local offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub active: bool,
    pub start: String,
    pub end: String,
}

impl DaySchedule {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            active: true,
            start: start.into(),
            end: end.into(),
        }
    }

    fn bounds(&self) -> Result<(NaiveTime, NaiveTime), String> {
        let start = NaiveTime::parse_from_str(&self.start, TIME_FORMAT)
            .map_err(|e| format!("bad shift start {:?}: {}", self.start, e))?;
        let end = NaiveTime::parse_from_str(&self.end, TIME_FORMAT)
            .map_err(|e| format!("bad shift end {:?}: {}", self.end, e))?;
        Ok((start, end))
    }

    /// Inclusive at both ends, minute resolution. A shift whose end is
    /// before its start runs past midnight.
    fn covers(&self, time: NaiveTime) -> Result<bool, String> {
        if !self.active {
            return Ok(false);
        }
        let (start, end) = self.bounds()?;
        Ok(if start <= end {
            time >= start && time <= end
        } else {
            time >= start || time <= end
        })
    }
}

/// Optional weekly schedule; when disabled the agent is always within hours
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingHours {
    pub enabled: bool,
    pub monday: Option<DaySchedule>,
    pub tuesday: Option<DaySchedule>,
    pub wednesday: Option<DaySchedule>,
    pub thursday: Option<DaySchedule>,
    pub friday: Option<DaySchedule>,
    pub saturday: Option<DaySchedule>,
    pub sunday: Option<DaySchedule>,
}

impl WorkingHours {
    /// Same shift Monday to Friday, weekends off
    pub fn weekdays(start: &str, end: &str) -> Self {
        let shift = Some(DaySchedule::new(start, end));
        Self {
            enabled: true,
            monday: shift.clone(),
            tuesday: shift.clone(),
            wednesday: shift.clone(),
            thursday: shift.clone(),
            friday: shift,
            saturday: None,
            sunday: None,
        }
    }

    pub fn schedule_for(&self, day: Weekday) -> Option<&DaySchedule> {
        match day {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    fn days(&self) -> impl Iterator<Item = &DaySchedule> {
        [
            &self.monday,
            &self.tuesday,
            &self.wednesday,
            &self.thursday,
            &self.friday,
            &self.saturday,
            &self.sunday,
        ]
        .into_iter()
        .flatten()
    }

    pub fn validate(&self) -> Result<(), String> {
        for day in self.days() {
            day.bounds()?;
        }
        Ok(())
    }

    /// Whether `local` (already shifted into the business offset) falls in a shift
    pub fn is_within(&self, local: NaiveDateTime) -> Result<bool, String> {
        if !self.enabled {
            return Ok(true);
        }
        let Some(today) = self.schedule_for(local.weekday()) else {
            return Ok(false);
        };
        let minute = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)
            .ok_or_else(|| format!("unrepresentable local time {}", local))?;
        today.covers(minute)
    }
}
