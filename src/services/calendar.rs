//! Google Calendar integration — meeting-link generation for schedules.
//!
//! OAuth tokens live as rows in `system_config` (not in memory), so every
//! request re-reads them and refreshes when the stored expiry is within a
//! 5-minute buffer. A missing or unrefreshable token set surfaces as
//! [`AppError::ReauthRequired`] carrying the consent URL; the callback in
//! `routes/auth.rs` completes the code exchange and stores the new set.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::db::Db;
use crate::errors::{AppError, AppResult};

const KEY_ACCESS_TOKEN:  &str = "GOOGLE_ACCESS_TOKEN";
const KEY_REFRESH_TOKEN: &str = "GOOGLE_REFRESH_TOKEN";
const KEY_TOKEN_EXPIRY:  &str = "GOOGLE_TOKEN_EXPIRY";

const OAUTH_TOKEN_URL:  &str = "https://oauth2.googleapis.com/token";
const OAUTH_AUTH_URL:   &str = "https://accounts.google.com/o/oauth2/v2/auth";
const CALENDAR_EVENTS_URL: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events?conferenceDataVersion=1";

const SCOPES: &str =
    "https://www.googleapis.com/auth/calendar https://www.googleapis.com/auth/calendar.events";

/// Refresh tokens this long before their stored expiry.
const TOKEN_EXPIRY_BUFFER_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token:  String,
    pub refresh_token: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub expiry_ms:     i64,
}

#[derive(Deserialize)]
struct OauthTokenResponse {
    access_token:  String,
    refresh_token: Option<String>,
    /// Seconds until expiry.
    expires_in:    Option<i64>,
}

pub struct CalendarService<'a> {
    pool:   &'a Db,
    config: &'a Config,
    http:   reqwest::Client,
}

impl<'a> CalendarService<'a> {
    pub fn new(pool: &'a Db, config: &'a Config) -> Self {
        Self {
            pool,
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Consent URL the client must visit when no usable token set exists.
    pub fn consent_url(config: &Config) -> String {
        format!(
            "{OAUTH_AUTH_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            urlencoding::encode(&config.google_client_id),
            urlencoding::encode(&config.google_redirect_uri()),
            urlencoding::encode(SCOPES),
        )
    }

    /// Exchange an authorization code for a token set and persist it.
    pub async fn exchange_code(&self, code: &str) -> AppResult<()> {
        let response = self
            .http
            .post(OAUTH_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", &self.config.google_client_id),
                ("client_secret", &self.config.google_client_secret),
                ("redirect_uri", &self.config.google_redirect_uri()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Integration(format!(
                "Google code exchange failed: {body}"
            )));
        }

        let tokens: OauthTokenResponse = response.json().await?;
        self.save_tokens(&to_token_set(tokens)).await
    }

    /// Load the stored token set, refreshing it when close to expiry.
    /// Missing tokens or a failed refresh map to `ReauthRequired`.
    pub async fn load_tokens(&self) -> AppResult<TokenSet> {
        let access  = self.read_config(KEY_ACCESS_TOKEN).await?;
        let refresh = self.read_config(KEY_REFRESH_TOKEN).await?;
        let expiry  = self.read_config(KEY_TOKEN_EXPIRY).await?;

        let (Some(access_token), Some(refresh_token)) = (access, refresh) else {
            return Err(self.reauth_required());
        };

        let expiry_ms = expiry.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);

        if Utc::now().timestamp_millis() + TOKEN_EXPIRY_BUFFER_MS >= expiry_ms {
            return self.refresh_tokens(&refresh_token).await;
        }

        Ok(TokenSet {
            access_token,
            refresh_token: Some(refresh_token),
            expiry_ms,
        })
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> AppResult<TokenSet> {
        let response = self
            .http
            .post(OAUTH_TOKEN_URL)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", &self.config.google_client_id),
                ("client_secret", &self.config.google_client_secret),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "Google token refresh request failed");
                self.reauth_required()
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Google token refresh rejected");
            return Err(self.reauth_required());
        }

        let refreshed: OauthTokenResponse = response
            .json()
            .await
            .map_err(|_| self.reauth_required())?;

        let mut set = to_token_set(refreshed);
        // Google omits the refresh token on refresh responses; keep the old one.
        if set.refresh_token.is_none() {
            set.refresh_token = Some(refresh_token.to_owned());
        }
        self.save_tokens(&set).await?;
        Ok(set)
    }

    /// Insert a calendar event with a Meet conference attached and return the
    /// join link. `request_id` keys the conference request (the schedule id).
    pub async fn create_meet_event(
        &self,
        tokens: &TokenSet,
        request_id: &str,
        subject: &str,
        description: &str,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        attendee_emails: &[&str],
    ) -> AppResult<String> {
        let attendees: Vec<_> = attendee_emails
            .iter()
            .map(|email| json!({ "email": email }))
            .collect();

        let event = json!({
            "summary": subject,
            "description": description,
            "start": { "dateTime": to_rfc3339_utc(start_time), "timeZone": "UTC" },
            "end":   { "dateTime": to_rfc3339_utc(end_time),   "timeZone": "UTC" },
            "attendees": attendees,
            "conferenceData": {
                "createRequest": {
                    "requestId": request_id,
                    "conferenceSolutionKey": { "type": "hangoutsMeet" },
                },
            },
        });

        let response = self
            .http
            .post(CALENDAR_EVENTS_URL)
            .bearer_auth(&tokens.access_token)
            .json(&event)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Integration(format!(
                "Calendar event insert failed: {body}"
            )));
        }

        let body: serde_json::Value = response.json().await?;
        body.get("hangoutLink")
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| {
                AppError::Integration("Calendar API did not return a meeting link".into())
            })
    }

    // ── Token persistence ─────────────────────────────────────

    async fn save_tokens(&self, tokens: &TokenSet) -> AppResult<()> {
        self.write_config(KEY_ACCESS_TOKEN, &tokens.access_token).await?;
        if let Some(refresh) = &tokens.refresh_token {
            self.write_config(KEY_REFRESH_TOKEN, refresh).await?;
        }
        self.write_config(KEY_TOKEN_EXPIRY, &tokens.expiry_ms.to_string()).await?;
        Ok(())
    }

    async fn read_config(&self, key: &str) -> AppResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT config_value FROM system_config WHERE config_key = ?",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;
        Ok(value)
    }

    async fn write_config(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO system_config (config_key, config_value)
             VALUES (?, ?)
             ON DUPLICATE KEY UPDATE config_value = VALUES(config_value)",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    fn reauth_required(&self) -> AppError {
        AppError::ReauthRequired {
            auth_url: Self::consent_url(self.config),
        }
    }
}

fn to_token_set(response: OauthTokenResponse) -> TokenSet {
    let expiry_ms = Utc::now().timestamp_millis() + response.expires_in.unwrap_or(0) * 1000;
    TokenSet {
        access_token:  response.access_token,
        refresh_token: response.refresh_token,
        expiry_ms,
    }
}

fn to_rfc3339_utc(value: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(value, Utc)
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_url_carries_client_and_scopes() {
        let config = test_config();
        let url = CalendarService::consent_url(&config);
        assert!(url.starts_with(OAUTH_AUTH_URL));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains(&urlencoding::encode(SCOPES).into_owned()));
    }

    #[test]
    fn rfc3339_rendering_is_utc() {
        let dt = NaiveDateTime::parse_from_str("2024-06-01T09:00:00", "%Y-%m-%dT%H:%M:%S").unwrap();
        assert_eq!(to_rfc3339_utc(dt), "2024-06-01T09:00:00Z");
    }

    fn test_config() -> Config {
        Config {
            db_host:              "db".into(),
            db_port:              3306,
            db_name:              "fitcoach".into(),
            db_user:              "fitcoach".into(),
            db_password:          "secret".into(),
            backend_host:         "0.0.0.0".into(),
            backend_port:         8080,
            jwt_secret:           "test".into(),
            google_client_id:     "client-1".into(),
            google_client_secret: "secret-1".into(),
            content_api_url:      String::new(),
            app_env:              "test".into(),
            app_base_url:         "http://localhost".into(),
        }
    }
}
