use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownState {
    Running,
    Paused,
    Expired,
}

impl CountdownState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountdownState::Running => "running",
            CountdownState::Paused => "paused",
            CountdownState::Expired => "expired",
        }
    }
}

/// Presentation-only classification of the time left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn from_remaining_seconds(seconds: u64) -> Self {
        let hours = seconds as f64 / 3600.0;
        if hours < 3.0 {
            Urgency::High
        } else if hours < 12.0 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingTime {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl RemainingTime {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    /// `DD:HH:MM:SS`
    pub fn display(&self) -> String {
        format!(
            "{:02}:{:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Deadline record that survives a reload or restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDeadline {
    pub time_constraint: String,
    pub end_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_remaining: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownSnapshot {
    pub state: CountdownState,
    pub time_constraint: String,
    pub end_at: DateTime<Utc>,
    pub remaining_seconds: u64,
    pub remaining: RemainingTime,
    pub display: String,
    pub urgency: Urgency,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerEvent {
    CountdownTick(CountdownTick),
    TimeExpired(TimeExpired),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CountdownTick {
    pub state: CountdownState,
    pub remaining_seconds: u64,
    pub display: String,
    pub urgency: Urgency,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimeExpired {
    pub end_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl TimerEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            TimerEvent::CountdownTick(_) => "countdown-tick",
            TimerEvent::TimeExpired(_) => "time-expired",
        }
    }
}
