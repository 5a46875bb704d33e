use crate::models::{Poll, PollChannel, PollStatus, Roster, Vote};
use crate::store::{ChannelConfigStore, IdentityResolver, PollStore, StoreError, VoteStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, migrate::MigrateDatabase};
use std::sync::Arc;

const POLL_COLUMNS: &str =
    "p.id, p.guild_id, p.config_id, p.title, p.description, p.created_at, p.ends_at, p.status";

const CHANNEL_COLUMNS: &str = "id, channel_id, quorum, vote_threshold, anonymous";

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self, StoreError> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Tables are filled by the poll bot; this service only reads them.
    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_channels (
                id TEXT PRIMARY KEY,
                channel_id TEXT NOT NULL,
                quorum REAL NOT NULL,
                vote_threshold REAL NOT NULL,
                anonymous BOOLEAN NOT NULL DEFAULT FALSE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id TEXT PRIMARY KEY,
                guild_id TEXT NOT NULL,
                config_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                ends_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'closed',
                FOREIGN KEY (config_id) REFERENCES poll_channels(id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_roster (
                poll_id TEXT NOT NULL,
                voter_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                participated BOOLEAN NOT NULL DEFAULT FALSE,
                abstained BOOLEAN NOT NULL DEFAULT FALSE,
                PRIMARY KEY (poll_id, voter_id),
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id TEXT PRIMARY KEY,
                poll_id TEXT NOT NULL,
                voter_id TEXT NOT NULL,
                choices TEXT NOT NULL,
                reason TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                guild_id TEXT NOT NULL,
                discord_id TEXT NOT NULL,
                name_history TEXT NOT NULL DEFAULT '[]',
                PRIMARY KEY (guild_id, discord_id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn roster(&self, poll_id: &str) -> Result<Roster, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT voter_id, participated, abstained
            FROM poll_roster
            WHERE poll_id = ?
            ORDER BY position
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        let mut roster = Roster::new();
        for row in &rows {
            let voter = row.get::<String, _>("voter_id");
            roster.insert(voter.clone(), row.get::<bool, _>("participated"));
            if row.get::<bool, _>("abstained") {
                roster
                    .mark_abstained(&voter, true)
                    .map_err(|e| corrupt(poll_id, "poll_roster", e.to_string()))?;
            }
        }
        Ok(roster)
    }

    /// Most recent name a guild member went by, if the member is known.
    pub async fn latest_name(
        &self,
        guild_id: &str,
        discord_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT name_history
            FROM users
            WHERE guild_id = ? AND discord_id = ?
            "#,
        )
        .bind(guild_id)
        .bind(discord_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let history: Vec<String> = serde_json::from_str(&row.get::<String, _>("name_history"))
            .map_err(|e| corrupt(discord_id, "name_history", e.to_string()))?;
        // Known members without a recorded name still resolve, to an empty name.
        Ok(Some(history.last().cloned().unwrap_or_default()))
    }
}

#[async_trait]
impl PollStore for Database {
    async fn poll(&self, poll_id: &str) -> Result<Option<Poll>, StoreError> {
        let poll = sqlx::query(&format!("SELECT {} FROM polls p WHERE p.id = ?", POLL_COLUMNS))
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| poll_from_row(&row))
            .transpose()?;

        match poll {
            Some(mut poll) => {
                poll.roster = self.roster(&poll.id).await?;
                Ok(Some(poll))
            }
            None => Ok(None),
        }
    }

    async fn polls_for_channel(&self, channel_id: &str) -> Result<Vec<Poll>, StoreError> {
        let mut polls = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM polls p
            JOIN poll_channels c ON p.config_id = c.id
            WHERE c.channel_id = ?
            ORDER BY p.rowid
            "#,
            POLL_COLUMNS
        ))
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(poll_from_row)
        .collect::<Result<Vec<_>, _>>()?;
        // Stored timestamps carry their own offsets, so text order is not time order.
        polls.sort_by_key(|poll| poll.created_at);

        for poll in &mut polls {
            poll.roster = self.roster(&poll.id).await?;
        }
        Ok(polls)
    }
}

#[async_trait]
impl VoteStore for Database {
    async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, poll_id, voter_id, choices, reason
            FROM votes
            WHERE poll_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id = row.get::<String, _>("id");
                let choices: Vec<String> = serde_json::from_str(&row.get::<String, _>("choices"))
                    .map_err(|e| corrupt(&id, "choices", e.to_string()))?;
                Ok(Vote {
                    poll_id: row.get("poll_id"),
                    voter: row.get("voter_id"),
                    choices,
                    reason: row.get("reason"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ChannelConfigStore for Database {
    async fn channel_config(&self, config_id: &str) -> Result<Option<PollChannel>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM poll_channels
            WHERE id = ?
            "#,
            CHANNEL_COLUMNS
        ))
        .bind(config_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(channel_from_row).transpose()
    }

    async fn channel_config_for_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<PollChannel>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM poll_channels
            WHERE channel_id = ?
            LIMIT 1
            "#,
            CHANNEL_COLUMNS
        ))
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(channel_from_row).transpose()
    }
}

// Roster is loaded separately
fn poll_from_row(row: &SqliteRow) -> Result<Poll, StoreError> {
    let id = row.get::<String, _>("id");
    let status = row
        .get::<String, _>("status")
        .parse::<PollStatus>()
        .map_err(|reason| corrupt(&id, "status", reason))?;
    let created_at = parse_timestamp(&id, "created_at", &row.get::<String, _>("created_at"))?;
    let ends_at = parse_timestamp(&id, "ends_at", &row.get::<String, _>("ends_at"))?;

    Ok(Poll {
        guild_id: row.get("guild_id"),
        config_id: row.get("config_id"),
        title: row.get("title"),
        description: row.get("description"),
        id,
        created_at,
        ends_at,
        status,
        roster: Roster::new(),
    })
}

fn channel_from_row(row: &SqliteRow) -> Result<PollChannel, StoreError> {
    let id = row.get::<String, _>("id");
    let quorum = percentage(row, &id, "quorum")?;
    let vote_threshold = percentage(row, &id, "vote_threshold")?;
    let anonymous = row
        .try_get::<bool, _>("anonymous")
        .map_err(|e| corrupt(&id, "anonymous", e.to_string()))?;

    Ok(PollChannel {
        channel_id: row.get("channel_id"),
        id,
        quorum,
        vote_threshold,
        anonymous,
    })
}

fn percentage(row: &SqliteRow, id: &str, field: &'static str) -> Result<f64, StoreError> {
    // Older tables store whole percentages as INTEGER.
    let value = row
        .try_get::<f64, _>(field)
        .or_else(|_| row.try_get::<i64, _>(field).map(|value| value as f64))
        .map_err(|e| corrupt(id, field, e.to_string()))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(corrupt(id, field, format!("{} is not a percentage", value)));
    }
    Ok(value)
}

fn parse_timestamp(id: &str, field: &'static str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(id, field, e.to_string()))
}

fn corrupt(id: &str, field: &'static str, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        id: id.to_string(),
        field,
        reason: reason.into(),
    }
}

/// Resolves voters to the latest name they used in the Nouncil guild.
pub struct NameHistory {
    database: Arc<Database>,
    guild_id: String,
}

impl NameHistory {
    pub fn new(database: Arc<Database>, guild_id: impl Into<String>) -> Self {
        Self {
            database,
            guild_id: guild_id.into(),
        }
    }
}

#[async_trait]
impl IdentityResolver for NameHistory {
    async fn display_name(&self, voter: &str) -> Result<Option<String>, StoreError> {
        self.database.latest_name(&self.guild_id, voter).await
    }
}
