use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teamswitch_bot::config::{CommandNames, RconSpec};
use teamswitch_bot::rcon::RconClient;
use teamswitch_bot::{build_registry, messages};
use teamswitch_core::{
    Backend, FactionCounts, FactionFilter, FetchError, Settings, SwitchCoordinator,
};

const TOKEN: &str = "test-token";

/// In-memory stand-in for a CRCON server
#[derive(Default)]
struct MockCrcon {
    players: Mutex<Value>,
    allies: Mutex<u32>,
    axis: Mutex<u32>,
    switched: Mutex<Vec<String>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {TOKEN}")[..])
}

async fn detailed_players(State(mock): State<Arc<MockCrcon>>, headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "failed": true }))).into_response();
    }
    let players = mock.players.lock().unwrap().clone();
    Json(json!({ "result": { "players": players }, "failed": false })).into_response()
}

async fn gamestate(State(mock): State<Arc<MockCrcon>>, headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let allies = *mock.allies.lock().unwrap();
    let axis = *mock.axis.lock().unwrap();
    Json(json!({
        "result": { "num_allied_players": allies, "num_axis_players": axis },
        "failed": false
    }))
    .into_response()
}

async fn switch_player_now(
    State(mock): State<Arc<MockCrcon>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let player_id = body["player_id"].as_str().unwrap_or_default().to_string();
    mock.switched.lock().unwrap().push(player_id);
    Json(json!({ "result": true, "failed": false })).into_response()
}

/// Helper to start a mock server and return its base url
async fn spawn_crcon(mock: Arc<MockCrcon>) -> String {
    let app = Router::new()
        .route("/api/get_detailed_players", get(detailed_players))
        .route("/api/get_gamestate", get(gamestate))
        .route("/api/switch_player_now", post(switch_player_now))
        .route(
            "/slow/api/get_gamestate",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        )
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn mock_with_players() -> Arc<MockCrcon> {
    let mock = MockCrcon::default();
    *mock.players.lock().unwrap() = json!({
        "76561198000000001": { "name": "Able", "steam_id_64": "76561198000000001", "team": "allies" },
        "76561198000000002": { "name": "Baker", "steam_id_64": "76561198000000002", "team": "axis" }
    });
    *mock.allies.lock().unwrap() = 10;
    *mock.axis.lock().unwrap() = 30;
    Arc::new(mock)
}

fn backend(base_url: &str, token: &str) -> Backend {
    let client = RconClient::new(base_url, token, Duration::from_secs(5)).unwrap();
    Backend::new("mock", Arc::new(client))
}

// =============================================================================
// TRANSPORT
// =============================================================================

#[tokio::test]
async fn test_fetch_roster_and_counts() {
    // GIVEN: A CRCON server with two players
    let base_url = spawn_crcon(mock_with_players()).await;
    let backend = backend(&format!("{base_url}/"), TOKEN);

    // WHEN: Reading roster and game state
    let roster = backend.roster().await.unwrap();
    let counts = backend.faction_counts().await.unwrap();

    // THEN: Both are decoded
    assert_eq!(roster.len(), 2);
    assert!(roster.iter().any(|e| e.display_name() == "Baker"));
    assert_eq!(counts, FactionCounts { allies: 10, axis: 30 });
}

#[tokio::test]
async fn test_wrong_token_is_status_error() {
    // GIVEN: A client with the wrong bearer token
    let base_url = spawn_crcon(mock_with_players()).await;
    let backend = backend(&base_url, "nope");

    // WHEN / THEN: Every call fails with 401
    assert_eq!(backend.roster().await, Err(FetchError::Status(401)));
    assert_eq!(backend.faction_counts().await, Err(FetchError::Status(401)));
}

#[tokio::test]
async fn test_switch_posts_player_id() {
    // GIVEN: A running CRCON server
    let mock = mock_with_players();
    let base_url = spawn_crcon(Arc::clone(&mock)).await;
    let backend = backend(&base_url, TOKEN);

    // WHEN: Switching a player
    let confirmed = backend.switch_player("76561198000000002").await;

    // THEN: The server saw the id and confirmed
    assert_eq!(confirmed, Ok(true));
    assert_eq!(*mock.switched.lock().unwrap(), vec!["76561198000000002"]);
}

#[tokio::test]
async fn test_hung_server_times_out() {
    // GIVEN: An endpoint that takes longer than the backend allows
    let base_url = spawn_crcon(mock_with_players()).await;
    let backend = backend(&format!("{base_url}/slow"), TOKEN).with_timeout(Duration::from_millis(100));

    // WHEN: Reading game state
    let result = backend.faction_counts().await;

    // THEN: It is a timeout, not a hang
    assert_eq!(result, Err(FetchError::Timeout(Duration::from_millis(100))));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let backend = backend("http://127.0.0.1:9", TOKEN);
    assert!(matches!(backend.roster().await, Err(FetchError::Transport(_))));
}

// =============================================================================
// FULL FLOW
// =============================================================================

#[tokio::test]
async fn test_list_then_switch_over_http() {
    // GIVEN: A registry built from config pointing at the mock server
    let mock = mock_with_players();
    let base_url = spawn_crcon(Arc::clone(&mock)).await;
    let specs = vec![RconSpec {
        name: "RCON1".into(),
        base_url,
        api_token: TOKEN.into(),
    }];
    let registry = build_registry(&specs, Duration::from_secs(5)).unwrap();
    let coordinator = SwitchCoordinator::new(registry, Settings::default());
    let commands = CommandNames::default();

    // WHEN: Listing Allies and switching number 1
    let listing = coordinator
        .list_players("allies".parse::<FactionFilter>().unwrap(), "1234")
        .await;
    let blocks = messages::listing_blocks(&listing, &commands);
    let outcome = coordinator
        .switch_by_number(1, Some(listing.generation), "1234".into())
        .await
        .unwrap();

    // THEN: The listing shows Able and the switch went through
    assert!(blocks[0].starts_with("RCON1 - Allies (1 players)\n1. Able"));
    assert_eq!(
        messages::outcome(&outcome),
        "Switch request for Able was successful."
    );
    assert_eq!(*mock.switched.lock().unwrap(), vec!["76561198000000001"]);
}

#[test]
fn test_empty_config_is_configuration_error() {
    let err = build_registry(&[], Duration::from_secs(1)).unwrap_err();
    assert_eq!(err.to_string(), "no rcon backends configured");
}
