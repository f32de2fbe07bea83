//! Exam countdown: a deadline computed from the time constraint when a plan
//! is created and persisted so a restart resumes it instead of starting over.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::metrics;
use crate::models::timer::{
    CountdownSnapshot, CountdownState, CountdownTick, PersistedDeadline, RemainingTime,
    TimeExpired, TimerEvent, Urgency,
};
use crate::utils::time::{parse_time_constraint, SECONDS_PER_DAY, SECONDS_PER_WEEK};

const DEADLINE_KEY: &str = "studyplan:countdown:deadline";

/// Longest study window accepted; larger constraints are clamped to it.
pub const MAX_WINDOW_SECONDS: u64 = 520 * SECONDS_PER_WEEK;

#[derive(Debug, Error)]
pub enum CountdownError {
    #[error("countdown has not been started")]
    NotStarted,

    #[error("countdown expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("deadline store failure: {0}")]
    Store(#[from] anyhow::Error),
}

#[async_trait]
pub trait DeadlineStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<PersistedDeadline>>;
    async fn save(&self, deadline: &PersistedDeadline, ttl_secs: u64) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct InMemoryDeadlineStore {
    slot: RwLock<Option<PersistedDeadline>>,
}

#[async_trait]
impl DeadlineStore for InMemoryDeadlineStore {
    async fn load(&self) -> anyhow::Result<Option<PersistedDeadline>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, deadline: &PersistedDeadline, _ttl_secs: u64) -> anyhow::Result<()> {
        *self.slot.write().await = Some(deadline.clone());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

pub struct RedisDeadlineStore {
    redis: ConnectionManager,
}

impl RedisDeadlineStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl DeadlineStore for RedisDeadlineStore {
    async fn load(&self) -> anyhow::Result<Option<PersistedDeadline>> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(DEADLINE_KEY)
            .query_async(&mut conn)
            .await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, deadline: &PersistedDeadline, ttl_secs: u64) -> anyhow::Result<()> {
        let mut conn = self.redis.clone();
        let json = serde_json::to_string(deadline)?;

        redis::cmd("SETEX")
            .arg(DEADLINE_KEY)
            .arg(ttl_secs.max(1))
            .arg(&json)
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("DEL")
            .arg(DEADLINE_KEY)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// Countdown state machine. Every query takes `now` so the clock stays with
/// the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    time_constraint: String,
    end_at: DateTime<Utc>,
    /// Remaining seconds frozen at the moment of pausing.
    paused_remaining: Option<u64>,
}

impl Countdown {
    pub fn start(time_constraint: &str, now: DateTime<Utc>) -> Self {
        let seconds = parse_time_constraint(time_constraint).min(MAX_WINDOW_SECONDS);
        let end_at = i64::try_from(seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            time_constraint: time_constraint.to_string(),
            end_at,
            paused_remaining: None,
        }
    }

    pub fn from_persisted(deadline: PersistedDeadline) -> Self {
        Self {
            time_constraint: deadline.time_constraint,
            end_at: deadline.end_at,
            paused_remaining: deadline.paused_remaining,
        }
    }

    pub fn persisted(&self) -> PersistedDeadline {
        PersistedDeadline {
            time_constraint: self.time_constraint.clone(),
            end_at: self.end_at,
            paused_remaining: self.paused_remaining,
        }
    }

    pub fn time_constraint(&self) -> &str {
        &self.time_constraint
    }

    fn live_remaining(&self, now: DateTime<Utc>) -> u64 {
        (self.end_at - now).num_seconds().max(0) as u64
    }

    pub fn state(&self, now: DateTime<Utc>) -> CountdownState {
        if now >= self.end_at {
            CountdownState::Expired
        } else if self.paused_remaining.is_some() {
            CountdownState::Paused
        } else {
            CountdownState::Running
        }
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        match self.state(now) {
            CountdownState::Expired => 0,
            CountdownState::Paused => self.paused_remaining.unwrap_or_default(),
            CountdownState::Running => self.live_remaining(now),
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), CountdownError> {
        match self.state(now) {
            CountdownState::Expired => Err(CountdownError::Expired(self.end_at)),
            CountdownState::Paused => Ok(()),
            CountdownState::Running => {
                self.paused_remaining = Some(self.live_remaining(now));
                Ok(())
            }
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), CountdownError> {
        if self.state(now) == CountdownState::Expired {
            return Err(CountdownError::Expired(self.end_at));
        }
        self.paused_remaining = None;
        Ok(())
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> CountdownSnapshot {
        let remaining_seconds = self.remaining_seconds(now);
        let remaining = RemainingTime::from_seconds(remaining_seconds);

        CountdownSnapshot {
            state: self.state(now),
            time_constraint: self.time_constraint.clone(),
            end_at: self.end_at,
            remaining_seconds,
            display: remaining.display(),
            remaining,
            urgency: Urgency::from_remaining_seconds(remaining_seconds),
        }
    }

    pub fn event(&self, now: DateTime<Utc>) -> TimerEvent {
        let snapshot = self.snapshot(now);
        match snapshot.state {
            CountdownState::Expired => TimerEvent::TimeExpired(TimeExpired {
                end_at: self.end_at,
                timestamp: now,
                message: "Time's up! Your study window has ended.".to_string(),
            }),
            _ => TimerEvent::CountdownTick(CountdownTick {
                state: snapshot.state,
                remaining_seconds: snapshot.remaining_seconds,
                display: snapshot.display,
                urgency: snapshot.urgency,
                timestamp: now,
            }),
        }
    }
}

/// Owns the current countdown and keeps the deadline store in sync.
pub struct CountdownService {
    store: Arc<dyn DeadlineStore>,
    current: RwLock<Option<Countdown>>,
}

impl CountdownService {
    pub fn new(store: Arc<dyn DeadlineStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    async fn persist(&self, countdown: &Countdown, now: DateTime<Utc>) -> Result<(), CountdownError> {
        // keep the record a day past the deadline
        let ttl = countdown.live_remaining(now) + SECONDS_PER_DAY;
        self.store.save(&countdown.persisted(), ttl).await?;
        Ok(())
    }

    /// Starts a fresh countdown for a new plan, replacing any stored
    /// deadline. Restarts pick the stored one up through `current`.
    pub async fn start(
        &self,
        time_constraint: &str,
        now: DateTime<Utc>,
    ) -> Result<CountdownSnapshot, CountdownError> {
        let countdown = Countdown::start(time_constraint, now);
        self.persist(&countdown, now).await?;
        tracing::info!(
            "Countdown started: constraint={}, end_at={}",
            time_constraint,
            countdown.end_at
        );
        metrics::record_countdown_transition("start");

        let snapshot = countdown.snapshot(now);
        *self.current.write().await = Some(countdown);
        Ok(snapshot)
    }

    /// Current countdown, reloading the persisted deadline after a restart.
    async fn current(&self) -> Result<Countdown, CountdownError> {
        if let Some(countdown) = self.current.read().await.clone() {
            return Ok(countdown);
        }

        let deadline = self.store.load().await?.ok_or(CountdownError::NotStarted)?;
        let countdown = Countdown::from_persisted(deadline);
        *self.current.write().await = Some(countdown.clone());
        Ok(countdown)
    }

    pub async fn snapshot(&self, now: DateTime<Utc>) -> Result<CountdownSnapshot, CountdownError> {
        Ok(self.current().await?.snapshot(now))
    }

    pub async fn event(&self, now: DateTime<Utc>) -> Result<TimerEvent, CountdownError> {
        Ok(self.current().await?.event(now))
    }

    pub async fn pause(&self, now: DateTime<Utc>) -> Result<CountdownSnapshot, CountdownError> {
        self.transition(now, "pause", Countdown::pause).await
    }

    pub async fn resume(&self, now: DateTime<Utc>) -> Result<CountdownSnapshot, CountdownError> {
        self.transition(now, "resume", Countdown::resume).await
    }

    async fn transition(
        &self,
        now: DateTime<Utc>,
        name: &str,
        apply: fn(&mut Countdown, DateTime<Utc>) -> Result<(), CountdownError>,
    ) -> Result<CountdownSnapshot, CountdownError> {
        let mut countdown = self.current().await?;
        apply(&mut countdown, now)?;
        self.persist(&countdown, now).await?;
        let snapshot = countdown.snapshot(now);
        *self.current.write().await = Some(countdown);

        tracing::info!("Countdown {}: state={}", name, snapshot.state.as_str());
        metrics::record_countdown_transition(name);
        Ok(snapshot)
    }

    /// Recomputes a fresh deadline from the original constraint.
    pub async fn reset(&self, now: DateTime<Utc>) -> Result<CountdownSnapshot, CountdownError> {
        let previous = self.current().await?;
        let countdown = Countdown::start(previous.time_constraint(), now);
        self.persist(&countdown, now).await?;

        let snapshot = countdown.snapshot(now);
        *self.current.write().await = Some(countdown);

        tracing::info!("Countdown reset: end_at={}", snapshot.end_at);
        metrics::record_countdown_transition("reset");
        Ok(snapshot)
    }

    pub async fn clear(&self) -> Result<(), CountdownError> {
        *self.current.write().await = None;
        self.store.clear().await?;
        tracing::debug!("Countdown cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn forty_eight_hours_expires_after_deadline() {
        let start = at(0);
        let countdown = Countdown::start("48 hours", start);
        assert_eq!(countdown.persisted().end_at, start + Duration::seconds(172_800));
        assert_eq!(countdown.state(at(172_799)), CountdownState::Running);

        let snapshot = countdown.snapshot(at(172_801));
        assert_eq!(snapshot.state, CountdownState::Expired);
        assert_eq!(snapshot.display, "00:00:00:00");
        assert_eq!(snapshot.remaining_seconds, 0);
    }

    #[test]
    fn pause_freezes_display_but_not_deadline() {
        let mut countdown = Countdown::start("2 hours", at(0));
        countdown.pause(at(600)).unwrap();

        let paused = countdown.snapshot(at(1200));
        assert_eq!(paused.state, CountdownState::Paused);
        assert_eq!(paused.remaining_seconds, 7200 - 600);

        countdown.resume(at(1200)).unwrap();
        assert_eq!(countdown.remaining_seconds(at(1200)), 7200 - 1200);
    }

    #[test]
    fn expiry_wins_over_pause() {
        let mut countdown = Countdown::start("1 hour", at(0));
        countdown.pause(at(10)).unwrap();
        assert_eq!(countdown.state(at(3600)), CountdownState::Expired);
        assert!(matches!(
            countdown.resume(at(3600)),
            Err(CountdownError::Expired(_))
        ));
        assert!(matches!(
            countdown.pause(at(4000)),
            Err(CountdownError::Expired(_))
        ));
    }

    #[test]
    fn expired_countdown_emits_time_expired() {
        let countdown = Countdown::start("1 hour", at(0));
        assert_eq!(countdown.event(at(60)).event_name(), "countdown-tick");
        assert_eq!(countdown.event(at(3600)).event_name(), "time-expired");
    }

    #[test]
    fn huge_constraint_is_clamped_to_the_longest_window() {
        let start = at(0);
        for constraint in ["3000000000 hours", "99999999999999999 hours", "999999999999 weeks"] {
            let countdown = Countdown::start(constraint, start);
            assert_eq!(
                countdown.persisted().end_at,
                start + Duration::seconds(MAX_WINDOW_SECONDS as i64)
            );
            assert_eq!(countdown.state(start), CountdownState::Running);
            assert_eq!(countdown.remaining_seconds(start), MAX_WINDOW_SECONDS);
        }
    }

    #[tokio::test]
    async fn new_plan_after_expiry_starts_running() {
        let service = CountdownService::new(Arc::new(InMemoryDeadlineStore::default()));
        service.start("48 hours", at(0)).await.unwrap();
        assert_eq!(
            service.snapshot(at(172_900)).await.unwrap().state,
            CountdownState::Expired
        );

        let restarted = service.start("48 hours", at(172_900)).await.unwrap();
        assert_eq!(restarted.state, CountdownState::Running);
        assert_eq!(restarted.remaining_seconds, 172_800);
    }

    #[tokio::test]
    async fn start_replaces_the_stored_deadline() {
        let store: Arc<dyn DeadlineStore> = Arc::new(InMemoryDeadlineStore::default());
        CountdownService::new(store.clone())
            .start("3 days", at(0))
            .await
            .unwrap();

        let second = CountdownService::new(store.clone());
        let started = second.start("3 days", at(500)).await.unwrap();
        assert_eq!(started.end_at, at(500) + Duration::seconds(3 * 86_400));

        let stored = store.load().await.unwrap().unwrap();
        assert_eq!(stored.end_at, started.end_at);
    }

    #[tokio::test]
    async fn pause_survives_restart() {
        let store: Arc<dyn DeadlineStore> = Arc::new(InMemoryDeadlineStore::default());
        let first = CountdownService::new(store.clone());
        first.start("2 hours", at(0)).await.unwrap();
        first.pause(at(600)).await.unwrap();

        let second = CountdownService::new(store.clone());
        let snapshot = second.snapshot(at(1800)).await.unwrap();
        assert_eq!(snapshot.state, CountdownState::Paused);
        assert_eq!(snapshot.remaining_seconds, 7200 - 600);

        let resumed = second.resume(at(1800)).await.unwrap();
        assert_eq!(resumed.state, CountdownState::Running);
        let stored = store.load().await.unwrap().unwrap();
        assert_eq!(stored.paused_remaining, None);
    }

    #[tokio::test]
    async fn snapshot_reloads_after_restart_and_reset_recomputes() {
        let store: Arc<dyn DeadlineStore> = Arc::new(InMemoryDeadlineStore::default());
        CountdownService::new(store.clone())
            .start("10 hours", at(0))
            .await
            .unwrap();

        let service = CountdownService::new(store.clone());
        let snapshot = service.snapshot(at(3600)).await.unwrap();
        assert_eq!(snapshot.remaining_seconds, 9 * 3600);
        assert_eq!(snapshot.urgency, Urgency::Medium);

        let reset = service.reset(at(3600)).await.unwrap();
        assert_eq!(reset.remaining_seconds, 10 * 3600);
        assert_eq!(reset.state, CountdownState::Running);
    }

    #[tokio::test]
    async fn cleared_countdown_is_not_started() {
        let service = CountdownService::new(Arc::new(InMemoryDeadlineStore::default()));
        assert!(matches!(
            service.snapshot(at(0)).await,
            Err(CountdownError::NotStarted)
        ));

        service.start("24 hours", at(0)).await.unwrap();
        service.clear().await.unwrap();
        assert!(matches!(
            service.pause(at(1)).await,
            Err(CountdownError::NotStarted)
        ));
    }
}
