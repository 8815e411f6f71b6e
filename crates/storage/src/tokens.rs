//! API tokens, user tiers and per-token request throttling.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::{format_time, parse_time, GeoContextStore};

/// A day: the longest throttling window a tier can have.
const LONGEST_PERIOD_SECS: i64 = 86_400;

/// A tier's allowance: `N/period`, or unlimited (`-`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestRate {
    Unlimited,
    Limited { requests: u32, period_secs: i64 },
}

impl FromStr for RequestRate {
    type Err = String;

    /// Periods are matched on their first letter: `s`, `m`, `h` or `d`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "-" {
            return Ok(RequestRate::Unlimited);
        }
        let (count, period) = s
            .split_once('/')
            .ok_or_else(|| format!("Invalid request limit '{}'", s))?;
        let requests: u32 = count
            .trim()
            .parse()
            .map_err(|_| format!("Invalid request count in '{}'", s))?;
        let period_secs = match period.trim().chars().next() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 3_600,
            Some('d') => LONGEST_PERIOD_SECS,
            _ => return Err(format!("Invalid request period in '{}'", s)),
        };
        Ok(RequestRate::Limited {
            requests,
            period_secs,
        })
    }
}

impl fmt::Display for RequestRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestRate::Unlimited => f.write_str("-"),
            RequestRate::Limited {
                requests,
                period_secs,
            } => {
                let period = match period_secs {
                    1 => "second",
                    60 => "minute",
                    3_600 => "hour",
                    _ => "day",
                };
                write!(f, "{}/{}", requests, period)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserTier {
    pub name: String,
    pub rate: RequestRate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiToken {
    pub token: String,
    pub username: String,
    pub tier: String,
    pub created_time: DateTime<Utc>,
}

/// Outcome of checking a token against its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    Allowed,
    UnknownToken,
    Throttled { retry_after_secs: i64 },
}

impl GeoContextStore {
    pub async fn upsert_tier(&self, name: &str, request_limit: &str) -> StoreResult<UserTier> {
        let rate: RequestRate = request_limit.parse().map_err(StoreError::Corrupt)?;
        sqlx::query(
            "INSERT INTO user_tiers (name, request_limit) VALUES (?, ?) \
             ON CONFLICT (name) DO UPDATE SET request_limit = excluded.request_limit",
        )
        .bind(name)
        .bind(rate.to_string())
        .execute(&self.pool)
        .await?;

        Ok(UserTier {
            name: name.to_string(),
            rate,
        })
    }

    pub async fn get_tier(&self, name: &str) -> StoreResult<UserTier> {
        let (request_limit,): (String,) =
            sqlx::query_as("SELECT request_limit FROM user_tiers WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| StoreError::not_found("Tier", name))?;

        Ok(UserTier {
            name: name.to_string(),
            rate: request_limit.parse().map_err(StoreError::Corrupt)?,
        })
    }

    /// Issue a new random token for `username` on an existing tier.
    pub async fn issue_token(&self, username: &str, tier: &str) -> StoreResult<ApiToken> {
        self.get_tier(tier).await?;

        let token = ApiToken {
            token: Uuid::new_v4().simple().to_string(),
            username: username.to_string(),
            tier: tier.to_string(),
            created_time: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO api_tokens (token, username, tier, created_time) VALUES (?, ?, ?, ?)",
        )
        .bind(&token.token)
        .bind(&token.username)
        .bind(&token.tier)
        .bind(format_time(token.created_time))
        .execute(&self.pool)
        .await?;

        debug!(username = %username, tier = %tier, "Issued API token");
        Ok(token)
    }

    pub async fn find_token(&self, token: &str) -> StoreResult<Option<(ApiToken, UserTier)>> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT t.username, t.tier, t.created_time, u.request_limit
            FROM api_tokens t JOIN user_tiers u ON u.name = t.tier
            WHERE t.token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some((username, tier, created_time, request_limit)) = row else {
            return Ok(None);
        };
        let rate = request_limit.parse().map_err(StoreError::Corrupt)?;
        Ok(Some((
            ApiToken {
                token: token.to_string(),
                username,
                tier: tier.clone(),
                created_time: parse_time(&created_time)?,
            },
            UserTier { name: tier, rate },
        )))
    }

    /// Check a token against its tier and record the request when allowed.
    ///
    /// Unlimited tiers record nothing. Requests that have left a limited
    /// tier's window are deleted.
    pub async fn check_token(&self, token: &str) -> StoreResult<TokenCheck> {
        let Some((_, tier)) = self.find_token(token).await? else {
            return Ok(TokenCheck::UnknownToken);
        };
        let RequestRate::Limited {
            requests,
            period_secs,
        } = tier.rate
        else {
            return Ok(TokenCheck::Allowed);
        };

        let now = Utc::now();
        let window_start = format_time(now - Duration::seconds(period_secs));
        sqlx::query("DELETE FROM token_requests WHERE token = ? AND requested_time <= ?")
            .bind(token)
            .bind(&window_start)
            .execute(&self.pool)
            .await?;

        let recent: Vec<(String,)> = sqlx::query_as(
            "SELECT requested_time FROM token_requests \
             WHERE token = ? AND requested_time > ? ORDER BY requested_time",
        )
        .bind(token)
        .bind(&window_start)
        .fetch_all(&self.pool)
        .await?;

        if recent.len() >= requests as usize {
            let retry_after_secs = match recent.first() {
                Some((oldest,)) => {
                    let oldest = parse_time(oldest)?;
                    (oldest + Duration::seconds(period_secs) - now)
                        .num_seconds()
                        .max(1)
                }
                None => period_secs,
            };
            return Ok(TokenCheck::Throttled { retry_after_secs });
        }

        sqlx::query("INSERT INTO token_requests (token, requested_time) VALUES (?, ?)")
            .bind(token)
            .bind(format_time(now))
            .execute(&self.pool)
            .await?;
        Ok(TokenCheck::Allowed)
    }

    /// Delete recorded requests older than the longest tier period.
    pub async fn prune_token_requests(&self) -> StoreResult<u64> {
        let cutoff = Utc::now() - Duration::seconds(LONGEST_PERIOD_SECS);
        let result = sqlx::query("DELETE FROM token_requests WHERE requested_time <= ?")
            .bind(format_time(cutoff))
            .execute(&self.pool)
            .await?;
        debug!(deleted = result.rows_affected(), "Pruned token requests");
        Ok(result.rows_affected())
    }

    /// Recorded requests still held for throttling, across all tokens.
    pub async fn count_token_requests(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM token_requests")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_rate() {
        assert_eq!("-".parse::<RequestRate>().unwrap(), RequestRate::Unlimited);
        assert_eq!(
            "100/day".parse::<RequestRate>().unwrap(),
            RequestRate::Limited {
                requests: 100,
                period_secs: 86_400
            }
        );
        assert_eq!(
            "10/min".parse::<RequestRate>().unwrap(),
            RequestRate::Limited {
                requests: 10,
                period_secs: 60
            }
        );
        assert!("lots".parse::<RequestRate>().is_err());
        assert!("5/fortnight".parse::<RequestRate>().is_err());
        assert!("x/day".parse::<RequestRate>().is_err());
    }

    #[test]
    fn test_display_request_rate() {
        assert_eq!("3/s".parse::<RequestRate>().unwrap().to_string(), "3/second");
        assert_eq!(RequestRate::Unlimited.to_string(), "-");
    }

    #[tokio::test]
    async fn test_issue_and_find_token() {
        let store = GeoContextStore::open_memory().await.unwrap();
        store.upsert_tier("free", "100/day").await.unwrap();
        let token = store.issue_token("alex", "free").await.unwrap();
        assert_eq!(token.token.len(), 32);

        let (found, tier) = store.find_token(&token.token).await.unwrap().unwrap();
        assert_eq!(found.username, "alex");
        assert_eq!(tier.name, "free");
        assert!(store.find_token("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issue_token_unknown_tier() {
        let store = GeoContextStore::open_memory().await.unwrap();
        assert!(store.issue_token("alex", "gold").await.is_err());
    }

    #[tokio::test]
    async fn test_throttle_limited_tier() {
        let store = GeoContextStore::open_memory().await.unwrap();
        store.upsert_tier("tiny", "2/day").await.unwrap();
        let token = store.issue_token("alex", "tiny").await.unwrap();

        assert_eq!(store.check_token(&token.token).await.unwrap(), TokenCheck::Allowed);
        assert_eq!(store.check_token(&token.token).await.unwrap(), TokenCheck::Allowed);
        assert!(matches!(
            store.check_token(&token.token).await.unwrap(),
            TokenCheck::Throttled { retry_after_secs } if retry_after_secs > 0
        ));
    }

    #[tokio::test]
    async fn test_unlimited_tier_and_unknown_token() {
        let store = GeoContextStore::open_memory().await.unwrap();
        store.upsert_tier("staff", "-").await.unwrap();
        let token = store.issue_token("admin", "staff").await.unwrap();
        for _ in 0..5 {
            assert_eq!(store.check_token(&token.token).await.unwrap(), TokenCheck::Allowed);
        }
        assert_eq!(
            store.check_token("nope").await.unwrap(),
            TokenCheck::UnknownToken
        );
    }

    #[tokio::test]
    async fn test_unlimited_tier_records_nothing() {
        let store = GeoContextStore::open_memory().await.unwrap();
        store.upsert_tier("staff", "-").await.unwrap();
        let token = store.issue_token("admin", "staff").await.unwrap();
        for _ in 0..50 {
            store.check_token(&token.token).await.unwrap();
        }
        assert_eq!(store.count_token_requests().await.unwrap(), 0);
    }

    async fn record_request(store: &GeoContextStore, token: &str, age: Duration) {
        sqlx::query("INSERT INTO token_requests (token, requested_time) VALUES (?, ?)")
            .bind(token)
            .bind(format_time(Utc::now() - age))
            .execute(store.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_requests_outside_window_are_deleted() {
        let store = GeoContextStore::open_memory().await.unwrap();
        store.upsert_tier("hourly", "2/hour").await.unwrap();
        let token = store.issue_token("alex", "hourly").await.unwrap();
        record_request(&store, &token.token, Duration::hours(3)).await;
        record_request(&store, &token.token, Duration::hours(2)).await;

        assert_eq!(store.check_token(&token.token).await.unwrap(), TokenCheck::Allowed);
        assert_eq!(store.count_token_requests().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prune_token_requests() {
        let store = GeoContextStore::open_memory().await.unwrap();
        store.upsert_tier("free", "100/day").await.unwrap();
        let token = store.issue_token("alex", "free").await.unwrap();
        record_request(&store, &token.token, Duration::days(2)).await;
        record_request(&store, &token.token, Duration::minutes(5)).await;

        assert_eq!(store.prune_token_requests().await.unwrap(), 1);
        assert_eq!(store.count_token_requests().await.unwrap(), 1);
    }
}
