//! HTTP client for a CRCON-style administration API.
//!
//! Every endpoint answers with an envelope `{"result": ..., "failed": bool}`.
//! Only the three calls the switch engine needs are implemented.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::{Map, Value, json};
use teamswitch_core::{BoxFuture, FactionCounts, FetchError, FetchResult, RconApi, RosterEntry};
use tracing::debug;

const ID_FIELDS: [&str; 4] = ["steam_id_64", "player_id", "id", "steam_id"];
const ALIAS_FIELDS: [&str; 3] = ["player_name", "nickname", "personaname"];

pub struct RconClient {
    base_url: String,
    api_token: String,
    http: Client,
}

impl RconClient {
    pub fn new(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/{}", self.base_url, name)
    }

    async fn send(&self, request: RequestBuilder) -> FetchResult<Value> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }

    async fn get(&self, name: &str) -> FetchResult<Value> {
        debug!(endpoint = name, base_url = %self.base_url, "rcon get");
        self.send(self.http.get(self.endpoint(name))).await
    }

    async fn post(&self, name: &str, body: &Value) -> FetchResult<Value> {
        debug!(endpoint = name, base_url = %self.base_url, "rcon post");
        self.send(self.http.post(self.endpoint(name)).json(body))
            .await
    }
}

impl RconApi for RconClient {
    fn fetch_roster(&self) -> BoxFuture<'_, FetchResult<Vec<RosterEntry>>> {
        Box::pin(async move {
            let body = self.get("get_detailed_players").await?;
            parse_roster(&body)
        })
    }

    fn fetch_faction_counts(&self) -> BoxFuture<'_, FetchResult<FactionCounts>> {
        Box::pin(async move {
            let body = self.get("get_gamestate").await?;
            parse_faction_counts(&body)
        })
    }

    fn command_switch<'a>(&'a self, player_id: &'a str) -> BoxFuture<'a, FetchResult<bool>> {
        Box::pin(async move {
            let body = self
                .post("switch_player_now", &json!({ "player_id": player_id }))
                .await?;
            Ok(parse_switch_confirmed(&body))
        })
    }
}

/// `result` of a read call. A set `failed` flag turns into [`FetchError::Rejected`].
fn read_result(body: &Value) -> FetchResult<&Value> {
    if is_failed(body) {
        let reason = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("call failed")
            .to_string();
        return Err(FetchError::Rejected(reason));
    }
    body.get("result")
        .filter(|r| !r.is_null())
        .ok_or_else(|| FetchError::Malformed("missing result".to_string()))
}

fn is_failed(body: &Value) -> bool {
    body.get("failed").and_then(Value::as_bool).unwrap_or(false)
}

/// Roster from `get_detailed_players`: `result.players` keyed by player id.
pub fn parse_roster(body: &Value) -> FetchResult<Vec<RosterEntry>> {
    let players = read_result(body)?
        .get("players")
        .and_then(Value::as_object)
        .ok_or_else(|| FetchError::Malformed("result.players is not an object".to_string()))?;

    Ok(players
        .iter()
        .filter_map(|(key, pdata)| pdata.as_object().map(|fields| roster_entry(key, fields)))
        .collect())
}

fn roster_entry(key: &str, fields: &Map<String, Value>) -> RosterEntry {
    RosterEntry {
        key: key.to_string(),
        ids: ID_FIELDS
            .iter()
            .filter_map(|f| text_field(fields, f))
            .collect(),
        name: text_field(fields, "name"),
        aliases: ALIAS_FIELDS
            .iter()
            .filter_map(|f| text_field(fields, f))
            .collect(),
        team: text_field(fields, "team"),
    }
}

/// String or number field as trimmed text. Empty and other types count as absent.
fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    let text = match fields.get(name)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Counts from `get_gamestate`. Missing counts read as zero.
pub fn parse_faction_counts(body: &Value) -> FetchResult<FactionCounts> {
    let result = read_result(body)?;
    Ok(FactionCounts {
        allies: count_field(result, "num_allied_players")?,
        axis: count_field(result, "num_axis_players")?,
    })
}

fn count_field(result: &Value, name: &str) -> FetchResult<u32> {
    let value = match result.get(name) {
        None | Some(Value::Null) => return Ok(0),
        Some(value) => value,
    };
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| FetchError::Malformed(format!("{name} is not a count: {value}")))
}

/// A switch only counts when `result` is literally `true` and nothing flagged failure.
pub fn parse_switch_confirmed(body: &Value) -> bool {
    body.get("result") == Some(&Value::Bool(true)) && !is_failed(body)
}
