// API client module: a small blocking HTTP client for the Synapse admin
// API. One method per endpoint, no shared state beyond the bearer token.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Fallback homeserver URL when neither `--url` nor `SYNAPSE_URL` is given.
pub const DEFAULT_URL: &str = "http://localhost:8008";

/// Holds a reqwest blocking client, the homeserver base URL and, once
/// `login` has run, the access token attached to every admin call.
pub struct AdminClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    home_server: Option<String>,
}

#[derive(Serialize, Debug)]
struct Identifier<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    user: &'a str,
}

/// Password-grant login payload (`m.login.password`).
#[derive(Serialize, Debug)]
struct LoginRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    identifier: Identifier<'a>,
    password: &'a str,
}

/// Login response. All fields default so a server omitting one of them
/// still parses; an empty `access_token` is rejected explicitly.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginResponse {
    pub user_id: String,
    pub access_token: String,
    pub home_server: String,
    pub device_id: String,
}

#[derive(Serialize, Debug)]
struct PasswordReset<'a> {
    password: &'a str,
    deactivated: bool,
}

#[derive(Serialize, Debug)]
struct JoinRequest<'a> {
    user_id: &'a str,
}

/// One record from the admin room listing. Synapse reports null for the
/// name, alias and encryption of plenty of rooms, hence the Options.
#[derive(Deserialize, Debug, Clone)]
pub struct Room {
    pub room_id: String,
    pub name: Option<String>,
    pub canonical_alias: Option<String>,
    pub creator: Option<String>,
    pub encryption: Option<String>,
    #[serde(default)]
    pub joined_local_members: i64,
}

#[derive(Deserialize, Debug)]
pub struct RoomList {
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub total_rooms: i64,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

impl AdminClient {
    /// Create an unauthenticated client for the given homeserver URL.
    pub fn new(base_url: &str) -> Result<Self> {
        reqwest::Url::parse(base_url)
            .with_context(|| format!("invalid homeserver URL: {base_url}"))?;
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(AdminClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            home_server: None,
        })
    }

    /// Returns whether a token is present in the client.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Server name of the logged-in account, for media purges.
    pub fn home_server(&self) -> Option<&str> {
        self.home_server.as_deref()
    }

    /// Helper to build the Authorization header map when a token is set.
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(t) = &self.token {
            let val = format!("Bearer {}", t);
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&val).unwrap());
        }
        headers
    }

    /// Exchange operator credentials for an access token via the password
    /// grant. On success the token is attached to all later calls.
    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let url = format!("{}/_matrix/client/r0/login", &self.base_url);
        let req = LoginRequest {
            kind: "m.login.password",
            identifier: Identifier {
                kind: "m.id.user",
                user,
            },
            password,
        };
        let res = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .context("failed to send login request")?;
        let body = res.text().context("reading login response")?;
        let auth: LoginResponse = serde_json::from_str(&body)
            .with_context(|| format!("failed to parse login response: {body}"))?;
        if auth.access_token.is_empty() {
            bail!("login returned no access token: {body}");
        }
        // Older servers send home_server, newer ones only user_id; fall
        // back to the domain part of the user id.
        let server = if auth.home_server.is_empty() {
            auth.user_id
                .split_once(':')
                .map(|(_, s)| s.to_string())
                .unwrap_or_default()
        } else {
            auth.home_server
        };
        self.home_server = (!server.is_empty()).then_some(server);
        self.token = Some(auth.access_token);
        tracing::debug!("logged in, device {}", auth.device_id);
        Ok(())
    }

    /// Invalidate the access token. Call this once the action is done.
    pub fn logout(&mut self) -> Result<()> {
        if self.token.is_none() {
            return Ok(());
        }
        let url = format!("{}/_matrix/client/r0/logout", &self.base_url);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .send()
            .context("failed to send logout request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("logout failed: {} - {}", status, txt);
        }
        self.token = None;
        Ok(())
    }

    /// List every account the server knows about. Returns the raw body.
    pub fn list_users(&self) -> Result<String> {
        let url = format!("{}/_synapse/admin/v2/users", &self.base_url);
        let res = self
            .client
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .context("failed to send user list request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("user list failed: {} - {}", status, txt);
        }
        res.text().context("reading user list response")
    }

    /// Fetch one account's record, including last seen IP and user agent.
    pub fn query_user(&self, user_id: &str) -> Result<String> {
        let url = format!("{}/_synapse/admin/v2/users/{}", &self.base_url, user_id);
        let res = self
            .client
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .context("failed to send user query request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("user query failed: {} - {}", status, txt);
        }
        res.text().context("reading user query response")
    }

    /// Deactivate an account and erase its data.
    pub fn deactivate(&self, user_id: &str) -> Result<String> {
        let url = format!("{}/_synapse/admin/v1/deactivate/{}", &self.base_url, user_id);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(&json!({ "erase": true }))
            .send()
            .context("failed to send deactivate request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("deactivate failed: {} - {}", status, txt);
        }
        res.text().context("reading deactivate response")
    }

    /// Set a new password on an account, reactivating it if needed.
    pub fn reset_password(&self, user_id: &str, new_password: &str) -> Result<String> {
        let url = format!("{}/_synapse/admin/v2/users/{}", &self.base_url, user_id);
        let req = PasswordReset {
            password: new_password,
            deactivated: false,
        };
        let res = self
            .client
            .put(&url)
            .headers(self.auth_headers())
            .json(&req)
            .send()
            .context("failed to send password reset request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("password reset failed: {} - {}", status, txt);
        }
        res.text().context("reading password reset response")
    }

    /// Room listing as the raw response body.
    pub fn list_rooms_body(&self) -> Result<String> {
        let url = format!("{}/_synapse/admin/v1/rooms", &self.base_url);
        let res = self
            .client
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .context("failed to send room list request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("room list failed: {} - {}", status, txt);
        }
        res.text().context("reading room list response")
    }

    /// Room listing parsed into records, for the sweep and the audit.
    pub fn list_rooms(&self) -> Result<RoomList> {
        let body = self.list_rooms_body()?;
        serde_json::from_str(&body).context("failed to parse room list")
    }

    /// Remove a room from the database so its alias can be reclaimed.
    pub fn delete_room(&self, room_id: &str) -> Result<String> {
        let url = format!(
            "{}/_synapse/admin/v1/rooms/{}/delete",
            &self.base_url, room_id
        );
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(&json!({}))
            .send()
            .context("failed to send room delete request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("room delete failed: {} - {}", status, txt);
        }
        let body = res.text().context("reading room delete response")?;
        if has_errcode(&body) {
            bail!("unable to delete room: {}", body);
        }
        Ok(body)
    }

    /// Same removal through the older purge endpoint.
    pub fn purge_room(&self, room_id: &str) -> Result<String> {
        let url = format!("{}/_synapse/admin/v1/purge_room", &self.base_url);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(&json!({ "room_id": room_id }))
            .send()
            .context("failed to send room purge request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("room purge failed: {} - {}", status, txt);
        }
        let body = res.text().context("reading room purge response")?;
        if has_errcode(&body) {
            bail!("unable to purge room: {}", body);
        }
        Ok(body)
    }

    /// Join a local user to a room without an invite.
    pub fn force_join(&self, user_id: &str, room_id: &str) -> Result<String> {
        let url = format!("{}/_synapse/admin/v1/join/{}", &self.base_url, room_id);
        let req = JoinRequest { user_id };
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(&req)
            .send()
            .context("failed to send join request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("join failed: {} - {}", status, txt);
        }
        res.text().context("reading join response")
    }

    /// Purge local media uploaded before the given unix-millisecond
    /// timestamp.
    pub fn purge_media(&self, server_name: &str, before_ts: u64) -> Result<String> {
        let url = format!(
            "{}/_synapse/admin/v1/media/{}/delete",
            &self.base_url, server_name
        );
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .query(&[("before_ts", before_ts)])
            .json(&json!({}))
            .send()
            .context("failed to send media purge request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("media purge failed: {} - {}", status, txt);
        }
        res.text().context("reading media purge response")
    }
}

/// Synapse reports some request-level failures inside a 200 body via an
/// errcode field.
pub fn has_errcode(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .map(|v| v.get("errcode").is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_payload_shape() {
        let req = LoginRequest {
            kind: "m.login.password",
            identifier: Identifier {
                kind: "m.id.user",
                user: "admin",
            },
            password: "hunter2",
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["type"], "m.login.password");
        assert_eq!(v["identifier"]["type"], "m.id.user");
        assert_eq!(v["identifier"]["user"], "admin");
        assert_eq!(v["password"], "hunter2");
    }

    #[test]
    fn password_reset_keeps_account_active() {
        let req = PasswordReset {
            password: "new-pass",
            deactivated: false,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["password"], "new-pass");
        assert_eq!(v["deactivated"], false);
    }

    #[test]
    fn login_response_tolerates_missing_fields() {
        let auth: LoginResponse = serde_json::from_str(r#"{"access_token":"tok"}"#).unwrap();
        assert_eq!(auth.access_token, "tok");
        assert!(auth.user_id.is_empty());
        assert!(auth.home_server.is_empty());
    }

    #[test]
    fn room_listing_parses_nulls() {
        let body = r##"{
            "offset": 0,
            "total_rooms": 2,
            "rooms": [
                {"room_id": "!a:x", "name": null, "canonical_alias": null,
                 "creator": "@u:x", "encryption": null, "joined_local_members": 0},
                {"room_id": "!b:x", "name": "ops", "canonical_alias": "#ops:x",
                 "creator": "@u:x", "encryption": "m.megolm.v1.aes-sha2",
                 "joined_local_members": 3}
            ]
        }"##;
        let list: RoomList = serde_json::from_str(body).unwrap();
        assert_eq!(list.total_rooms, 2);
        assert_eq!(list.rooms.len(), 2);
        assert!(list.rooms[0].name.is_none());
        assert_eq!(list.rooms[1].canonical_alias.as_deref(), Some("#ops:x"));
    }

    #[test]
    fn errcode_detection() {
        assert!(has_errcode(
            r#"{"errcode":"M_UNKNOWN","error":"Cannot delete"}"#
        ));
        assert!(!has_errcode(r#"{"kicked_users":[]}"#));
        assert!(!has_errcode("not json at all"));
    }

    #[test]
    fn rejects_invalid_homeserver_url() {
        assert!(AdminClient::new("not a url").is_err());
        assert!(AdminClient::new("https://matrix.example.org/").is_ok());
    }
}
