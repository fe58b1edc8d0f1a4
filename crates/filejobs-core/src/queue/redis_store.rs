//! Redis-backed job store.
//!
//! Key layout per queue (`<prefix>:<queue>:...`):
//! - `pending`    LIST  jobs ready to run (RPUSH, claimed from the left)
//! - `processing` ZSET  jobs leased by a worker, scored by lease deadline (ms)
//! - `scheduled`  ZSET  jobs waiting for a retry, scored by due time (ms)
//! - `dead`       LIST  jobs that exhausted their attempts
//! - `succeeded`  counter
//!
//! Jobs are stored as JSON. A claimed job sits in `processing` as
//! `<claim token>:<json>`, where the token is a fresh ULID per claim; ack/fail
//! remove exactly that member, so a holder whose lease expired and was
//! re-claimed elsewhere gets `NotLeased`.
//!
//! Every transition that touches more than one key runs as a single Lua
//! script, so a job is always under exactly one key. A lease whose deadline
//! passes (worker crashed or hung) is returned to `pending` by the next
//! `lease` call on that queue.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::Script;
use redis::aio::MultiplexedConnection;

use super::{Decision, RetryPolicy};
use crate::config::RedisConfig;
use crate::domain::{Job, JobId, QueueName};
use crate::error::StoreError;
use crate::observability::QueueCounts;
use crate::ports::{JobLease, JobStore};

/// KEYS: scheduled, processing, pending. ARGV: now (ms), claim token length.
/// Returns the number of expired leases put back.
static PROMOTE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
        for _, raw in ipairs(due) do
            redis.call('ZREM', KEYS[1], raw)
            redis.call('RPUSH', KEYS[3], raw)
        end
        local expired = redis.call('ZRANGEBYSCORE', KEYS[2], '-inf', ARGV[1])
        for _, member in ipairs(expired) do
            redis.call('ZREM', KEYS[2], member)
            redis.call('RPUSH', KEYS[3], string.sub(member, ARGV[2] + 2))
        end
        return #expired
        ",
    )
});

/// KEYS: pending, processing. ARGV: lease deadline (ms), claim token.
static CLAIM: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        local raw = redis.call('LPOP', KEYS[1])
        if not raw then
            return false
        end
        redis.call('ZADD', KEYS[2], ARGV[1], ARGV[2] .. ':' .. raw)
        return raw
        ",
    )
});

/// KEYS: processing, succeeded. ARGV: processing member.
static ACK: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('ZREM', KEYS[1], ARGV[1]) == 0 then
            return 0
        end
        redis.call('INCR', KEYS[2])
        return 1
        ",
    )
});

/// KEYS: processing, scheduled. ARGV: processing member, updated job, due (ms).
static RETRY: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('ZREM', KEYS[1], ARGV[1]) == 0 then
            return 0
        end
        redis.call('ZADD', KEYS[2], ARGV[3], ARGV[2])
        return 1
        ",
    )
});

/// KEYS: processing, dead. ARGV: processing member, job to bury.
static BURY: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('ZREM', KEYS[1], ARGV[1]) == 0 then
            return 0
        end
        redis.call('RPUSH', KEYS[2], ARGV[2])
        return 1
        ",
    )
});

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueKeys {
    pending: String,
    processing: String,
    scheduled: String,
    dead: String,
    succeeded: String,
}

impl QueueKeys {
    fn new(prefix: &str, queue: &QueueName) -> Self {
        let base = format!("{prefix}:{queue}");
        Self {
            pending: format!("{base}:pending"),
            processing: format!("{base}:processing"),
            scheduled: format!("{base}:scheduled"),
            dead: format!("{base}:dead"),
            succeeded: format!("{base}:succeeded"),
        }
    }
}

/// Length of a ULID in its canonical text form.
const CLAIM_TOKEN_LEN: usize = 26;

/// A job claimed from `pending`.
struct Claim {
    raw: String,
    member: String,
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

pub struct RedisJobStore {
    conn: MultiplexedConnection,
    prefix: String,
    retry_policy: RetryPolicy,
    max_attempts: u32,
    poll_interval: Duration,
    lease_timeout: Duration,
}

impl RedisJobStore {
    pub const DEFAULT_PREFIX: &'static str = "filejobs";

    pub async fn connect(config: &RedisConfig, retry_policy: RetryPolicy) -> Result<Self, StoreError> {
        let store = Self::open(&config.url(), retry_policy).await?;
        tracing::info!(host = %config.host, port = config.port, "connected to redis");
        Ok(store)
    }

    /// Connect to a `redis://` URL.
    pub async fn open(url: &str, retry_policy: RetryPolicy) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        Ok(Self {
            conn,
            prefix: Self::DEFAULT_PREFIX.to_string(),
            retry_policy,
            max_attempts: 5,
            poll_interval: Duration::from_secs(1),
            lease_timeout: Duration::from_secs(300),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// How long a claimed job may stay unsettled before it is redelivered.
    pub fn with_lease_timeout(mut self, lease_timeout: Duration) -> Self {
        self.lease_timeout = lease_timeout;
        self
    }

    fn keys(&self, queue: &QueueName) -> QueueKeys {
        QueueKeys::new(&self.prefix, queue)
    }

    /// Move due retries and expired leases back to `pending`.
    async fn promote(&self, queue: &QueueName, keys: &QueueKeys) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let expired: i64 = PROMOTE
            .key(&keys.scheduled)
            .key(&keys.processing)
            .key(&keys.pending)
            .arg(Utc::now().timestamp_millis())
            .arg(CLAIM_TOKEN_LEN)
            .invoke_async(&mut conn)
            .await?;
        if expired > 0 {
            tracing::warn!(queue = %queue, count = expired, "expired leases returned to pending");
        }
        Ok(())
    }

    async fn try_claim(&self, keys: &QueueKeys) -> Result<Option<Claim>, StoreError> {
        let mut conn = self.conn.clone();
        let token = ulid::Ulid::new().to_string();
        let deadline = Utc::now()
            .timestamp_millis()
            .saturating_add(millis(self.lease_timeout));
        let raw: Option<String> = CLAIM
            .key(&keys.pending)
            .key(&keys.processing)
            .arg(deadline)
            .arg(&token)
            .invoke_async(&mut conn)
            .await?;
        Ok(raw.map(|raw| Claim {
            member: format!("{token}:{raw}"),
            raw,
        }))
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn enqueue(
        &self,
        queue: &QueueName,
        payload: serde_json::Value,
    ) -> Result<JobId, StoreError> {
        let job = Job::new(queue.clone(), payload, self.max_attempts);
        let raw = serde_json::to_string(&job)?;
        let keys = self.keys(queue);

        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("RPUSH")
            .arg(&keys.pending)
            .arg(&raw)
            .query_async(&mut conn)
            .await?;

        tracing::debug!(queue = %queue, job_id = %job.id(), "job enqueued");
        Ok(job.id())
    }

    async fn lease(&self, queue: &QueueName) -> Result<Option<Box<dyn JobLease>>, StoreError> {
        let keys = self.keys(queue);
        self.promote(queue, &keys).await?;

        let claim = match self.try_claim(&keys).await? {
            Some(claim) => claim,
            None => {
                tokio::time::sleep(self.poll_interval).await;
                match self.try_claim(&keys).await? {
                    Some(claim) => claim,
                    None => return Ok(None),
                }
            }
        };

        let job: Job = match serde_json::from_str(&claim.raw) {
            Ok(job) => job,
            Err(e) => {
                // 壊れたデータは dead に退避して次へ
                tracing::error!(queue = %queue, error = %e, "dropping malformed job to dead-letter");
                let mut conn = self.conn.clone();
                let _: i64 = BURY
                    .key(&keys.processing)
                    .key(&keys.dead)
                    .arg(&claim.member)
                    .arg(&claim.raw)
                    .invoke_async(&mut conn)
                    .await?;
                return Err(StoreError::Corrupt(e));
            }
        };

        Ok(Some(Box::new(RedisLease {
            job,
            member: claim.member,
            keys,
            conn: self.conn.clone(),
            retry_policy: self.retry_policy.clone(),
        })))
    }

    async fn counts(&self, queue: &QueueName) -> Result<QueueCounts, StoreError> {
        let keys = self.keys(queue);
        let mut conn = self.conn.clone();

        let (queued, running, retry_scheduled, dead, succeeded): (usize, usize, usize, usize, Option<usize>) =
            redis::pipe()
                .cmd("LLEN")
                .arg(&keys.pending)
                .cmd("ZCARD")
                .arg(&keys.processing)
                .cmd("ZCARD")
                .arg(&keys.scheduled)
                .cmd("LLEN")
                .arg(&keys.dead)
                .cmd("GET")
                .arg(&keys.succeeded)
                .query_async(&mut conn)
                .await?;

        Ok(QueueCounts {
            queued,
            running,
            succeeded: succeeded.unwrap_or(0),
            retry_scheduled,
            dead,
        })
    }
}

struct RedisLease {
    job: Job,
    member: String,
    keys: QueueKeys,
    conn: MultiplexedConnection,
    retry_policy: RetryPolicy,
}

impl RedisLease {
    fn settled(&self, removed: i64) -> Result<(), StoreError> {
        if removed == 0 {
            return Err(StoreError::NotLeased(self.job.id().to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl JobLease for RedisLease {
    fn job(&self) -> &Job {
        &self.job
    }

    async fn ack(mut self: Box<Self>) -> Result<(), StoreError> {
        let removed: i64 = ACK
            .key(&self.keys.processing)
            .key(&self.keys.succeeded)
            .arg(&self.member)
            .invoke_async(&mut self.conn)
            .await?;
        self.settled(removed)
    }

    async fn fail(mut self: Box<Self>, reason: String) -> Result<(), StoreError> {
        let mut job = self.job.clone();
        job.record_failure(reason);
        let updated = serde_json::to_string(&job)?;

        match self.retry_policy.decide(&job) {
            Decision::Retry { delay } => {
                let due_ms = Utc::now().timestamp_millis().saturating_add(millis(delay));
                let removed: i64 = RETRY
                    .key(&self.keys.processing)
                    .key(&self.keys.scheduled)
                    .arg(&self.member)
                    .arg(&updated)
                    .arg(due_ms)
                    .invoke_async(&mut self.conn)
                    .await?;
                self.settled(removed)?;
                tracing::debug!(
                    job_id = %job.id(),
                    attempts = job.attempts,
                    delay_ms = millis(delay),
                    "job retry scheduled"
                );
            }
            Decision::DeadLetter => {
                let removed: i64 = BURY
                    .key(&self.keys.processing)
                    .key(&self.keys.dead)
                    .arg(&self.member)
                    .arg(&updated)
                    .invoke_async(&mut self.conn)
                    .await?;
                self.settled(removed)?;
                tracing::warn!(
                    job_id = %job.id(),
                    attempts = job.attempts,
                    reason = job.last_error.as_deref().unwrap_or_default(),
                    "job dead-lettered"
                );
            }
        }
        Ok(())
    }
}
