use super::*;
use crate::store::HttpUnitStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::put,
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{Comment, Unit};
use tokio::{
    net::TcpListener,
    sync::{mpsc, Mutex},
};

#[derive(Clone)]
struct ServerState {
    tx: mpsc::UnboundedSender<(String, Value)>,
    status: StatusCode,
}

async fn handle_update(
    State(state): State<ServerState>,
    Path(unit_number): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let _ = state.tx.send((unit_number, body));
    (state.status, Json(json!({ "ok": state.status.is_success() })))
}

async fn spawn_update_server(
    status: StatusCode,
) -> (String, mpsc::UnboundedReceiver<(String, Value)>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/api/units/:unit_number", put(handle_update))
        .with_state(ServerState { tx, status });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api/units"), rx)
}

fn view_with_comments() -> ViewState {
    let mut view = ViewState::new();
    view.load(vec![
        Unit::new("101", "Level 1").with_comments(vec![Comment {
            text: "missing outlet cover".into(),
            timestamp: Some("6/1/2024, 8:00 AM".into()),
            resolved: false,
        }]),
        Unit::new("102", "Level 1").with_status(Some(Status::Approved)),
    ]);
    view
}

async fn http_dispatcher(status: StatusCode) -> (MutationDispatcher, mpsc::UnboundedReceiver<(String, Value)>) {
    let (api_url, rx) = spawn_update_server(status).await;
    let store = HttpUnitStore::new(&api_url).expect("store");
    (MutationDispatcher::new(Arc::new(store)), rx)
}

#[tokio::test]
async fn change_status_puts_status_field() {
    let (dispatcher, mut requests) = http_dispatcher(StatusCode::OK).await;
    let view = view_with_comments();

    dispatcher
        .change_status(&view, "Level 1", "101", Some(Status::OkToPreRock))
        .expect("dispatched")
        .await
        .expect("join");

    let (unit_number, body) = requests.recv().await.expect("request");
    assert_eq!(unit_number, "101");
    assert_eq!(body, json!({ "status": "Ok to Pre-Rock" }));
}

#[tokio::test]
async fn clearing_status_sends_null() {
    let (dispatcher, mut requests) = http_dispatcher(StatusCode::OK).await;
    let view = view_with_comments();

    dispatcher
        .change_status(&view, "Level 1", "102", None)
        .expect("dispatched")
        .await
        .expect("join");

    let (unit_number, body) = requests.recv().await.expect("request");
    assert_eq!(unit_number, "102");
    assert_eq!(body, json!({ "status": null }));
}

#[tokio::test]
async fn add_comment_and_toggle_send_their_fields() {
    let (dispatcher, mut requests) = http_dispatcher(StatusCode::OK).await;
    let view = view_with_comments();

    dispatcher
        .add_comment(&view, "Level 1", "101", "insulation gap north wall")
        .expect("dispatched")
        .await
        .expect("join");
    dispatcher
        .toggle_comment_resolved(&view, "Level 1", "101", 0)
        .expect("dispatched")
        .await
        .expect("join");

    let (_, comment) = requests.recv().await.expect("comment request");
    assert_eq!(comment, json!({ "comment": "insulation gap north wall" }));
    let (_, toggle) = requests.recv().await.expect("toggle request");
    assert_eq!(toggle, json!({ "commentIndex": 0 }));
}

#[tokio::test]
async fn dispatch_never_touches_local_state() {
    let (dispatcher, mut requests) = http_dispatcher(StatusCode::OK).await;
    let view = view_with_comments();
    let before = view.groups().to_vec();

    dispatcher
        .add_comment(&view, "Level 1", "102", "check fire caulk")
        .expect("dispatched")
        .await
        .expect("join");
    requests.recv().await.expect("request");

    assert_eq!(view.groups(), before.as_slice());
}

#[tokio::test]
async fn server_failure_is_swallowed() {
    let (dispatcher, mut requests) = http_dispatcher(StatusCode::INTERNAL_SERVER_ERROR).await;
    let view = view_with_comments();

    let outcome = dispatcher
        .change_status(&view, "Level 1", "101", Some(Status::Issue))
        .expect("dispatched")
        .await;
    assert!(outcome.is_ok(), "failed request must not panic the task");
    requests.recv().await.expect("request reached server");
}

#[tokio::test]
async fn unreachable_store_is_swallowed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let store = HttpUnitStore::new(&format!("http://{addr}/api/units")).expect("store");
    let dispatcher = MutationDispatcher::new(Arc::new(store));
    let view = view_with_comments();

    let outcome = dispatcher
        .change_status(&view, "Level 1", "101", None)
        .expect("dispatched")
        .await;
    assert!(outcome.is_ok());
}

struct RecordingStore {
    patches: Mutex<Vec<(String, UnitPatch)>>,
}

#[async_trait::async_trait]
impl UnitStore for RecordingStore {
    async fn list_units(&self) -> Result<Vec<Unit>, crate::error::ClientError> {
        Ok(Vec::new())
    }

    async fn update_unit(
        &self,
        unit_number: &str,
        patch: &UnitPatch,
    ) -> Result<(), crate::error::ClientError> {
        self.patches
            .lock()
            .await
            .push((unit_number.to_string(), patch.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn unresolvable_or_invalid_intents_are_not_sent() {
    let store = Arc::new(RecordingStore {
        patches: Mutex::new(Vec::new()),
    });
    let dispatcher = MutationDispatcher::new(store.clone());
    let view = view_with_comments();

    assert!(dispatcher
        .change_status(&view, "Level 2", "101", Some(Status::Issue))
        .is_none());
    assert!(dispatcher
        .add_comment(&view, "Level 1", "101", "   \n")
        .is_none());
    assert!(dispatcher
        .toggle_comment_resolved(&view, "Level 1", "101", 1)
        .is_none());
    assert!(dispatcher
        .toggle_comment_resolved(&view, "Level 1", "102", 0)
        .is_none());

    dispatcher
        .add_comment(&view, "Level 1", "102", "ok")
        .expect("dispatched")
        .await
        .expect("join");

    let patches = store.patches.lock().await;
    assert_eq!(
        patches.as_slice(),
        [("102".to_string(), UnitPatch::comment("ok"))]
    );
}
