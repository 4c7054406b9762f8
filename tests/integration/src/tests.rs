//! Integration tests for the console
//!
//! Each test spawns its own mock backend on an ephemeral port.
//! Run with: cargo test -p integration-tests

use std::sync::Arc;
use std::time::Duration;

use console::api::SocketEvent;
use console::domain::container::ContainerAction;
use console::domain::settings::{SettingsPatch, Theme};
use console::infra::navigation::Route;
use console::infra::storage::{KeyValueStore, MemoryStore, SETTINGS_KEY, TOKEN_KEY, USER_KEY};
use console::infra::theme::ColorScheme;
use console::service::containers::ContainerDetailView;
use console::service::gate::{Decision, GateEvent, Guard};
use console::service::session::SessionStatus;
use console::Error;
use integration_tests::*;

async fn backend() -> MockBackend {
    init_tracing();
    MockBackend::spawn()
        .await
        .expect("Failed to start mock backend")
}

async fn next_event(view: &mut ContainerDetailView) -> SocketEvent {
    tokio::time::timeout(Duration::from_secs(5), view.next_event())
        .await
        .expect("Timed out waiting for a stream event")
        .expect("Stream ended")
}

/// Detail view with its stream open and the greeting received
async fn connected_view(console: &TestConsole, id: &str) -> ContainerDetailView {
    let mut view = console.context.detail_view(id);
    view.open().await;
    assert_eq!(next_event(&mut view).await, SocketEvent::Opened);
    next_event(&mut view).await;
    assert!(view.stream().is_connected());
    assert_eq!(view.stream().logs(), &["Connected to log stream", "hello"]);
    view
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_sign_in_persists_credential_and_goes_to_dashboard() {
    let backend = backend().await;
    let console = TestConsole::new(&backend).expect("Failed to build console");

    let signed_in = console
        .context
        .handle_auth_callback(Some(GOOD_CODE))
        .await;
    assert!(signed_in);

    let session = console.context.session();
    assert!(session.is_authenticated());
    assert_eq!(
        session.user().map(|u| u.display_name().to_string()),
        Some("Ada Lovelace".to_string())
    );
    assert_eq!(console.navigator.routes(), vec![Route::Dashboard]);
    assert_eq!(
        console.storage.get(TOKEN_KEY).unwrap().as_deref(),
        Some(ISSUED_TOKEN)
    );
    assert!(console.storage.get(USER_KEY).unwrap().is_some());

    // The credential rides on every REST call
    let view = console.context.list_view();
    assert!(view.refresh().await);
    let listed = backend
        .requests()
        .into_iter()
        .find(|r| r.path == "/api/containers")
        .expect("List request recorded");
    assert_eq!(listed.bearer.as_deref(), Some(ISSUED_TOKEN));
}

#[tokio::test]
async fn test_failed_exchange_surfaces_error() {
    let backend = backend().await;
    let console = TestConsole::new(&backend).expect("Failed to build console");
    let session = console.context.session();

    let result = session.complete_sign_in("bogus").await;
    assert!(matches!(result, Err(Error::SignInFailed(_))));
    let message = session.error().expect("Error surfaced");
    assert!(message.starts_with("Sign in failed: "));
    assert!(message.contains("Invalid authorization code"));
    assert!(!session.is_authenticated());
    assert!(console.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_incomplete_sign_in_response_is_rejected() {
    let backend = backend().await;
    let console = TestConsole::new(&backend).expect("Failed to build console");

    let result = console.context.session().complete_sign_in(INCOMPLETE_CODE).await;
    assert!(matches!(result, Err(Error::InvalidAuthResponse)));
    assert!(console.storage.get(TOKEN_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_id_token_sign_in() {
    let backend = backend().await;
    let console = TestConsole::new(&backend).expect("Failed to build console");

    let user = console
        .context
        .session()
        .complete_sign_in_with_id_token(GOOD_ID_TOKEN)
        .await
        .expect("ID token sign-in failed");
    assert_eq!(user.email, "ada@example.com");

    // The login page's gate moves the user on
    let mut gate = console.context.gate(Guard::LoginOnly);
    assert_eq!(gate.evaluate(), Decision::Redirect(Route::Dashboard));
    assert_eq!(console.navigator.routes(), vec![Route::Dashboard]);
}

#[tokio::test]
async fn test_google_redirect_targets_provider() {
    let backend = backend().await;
    let console = TestConsole::new(&backend).expect("Failed to build console");

    console
        .context
        .session()
        .sign_in_with_google()
        .expect("Failed to build authorization URL");
    let external = console.navigator.external();
    assert_eq!(external.len(), 1);
    assert!(external[0].starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
}

#[tokio::test]
async fn test_restored_session_is_verified() {
    let backend = backend().await;
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    {
        let first = TestConsole::with_storage(&backend, storage.clone()).expect("Failed to build console");
        first
            .context
            .session()
            .complete_sign_in(GOOD_CODE)
            .await
            .expect("Sign-in failed");
    }

    let console = TestConsole::with_storage(&backend, storage).expect("Failed to build console");
    assert_eq!(console.context.session().status(), SessionStatus::Loading);
    assert!(console.context.start().await.is_authenticated());
    assert_eq!(backend.count("POST", "/api/auth/verify-token"), 1);
}

#[tokio::test]
async fn test_rejected_persisted_token_is_cleared() {
    let backend = backend().await;
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    {
        let first = TestConsole::with_storage(&backend, storage.clone()).expect("Failed to build console");
        first
            .context
            .session()
            .complete_sign_in(GOOD_CODE)
            .await
            .expect("Sign-in failed");
    }
    backend.revoke(ISSUED_TOKEN);

    let console = TestConsole::with_storage(&backend, storage.clone()).expect("Failed to build console");
    assert_eq!(console.context.start().await, SessionStatus::Unauthenticated);
    assert!(storage.get(TOKEN_KEY).unwrap().is_none());
    assert!(storage.get(USER_KEY).unwrap().is_none());
    assert!(console.context.session().error().is_some());
}

#[tokio::test]
async fn test_sign_out_is_local() {
    let backend = backend().await;
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");
    let before = backend.requests().len();

    console.context.session().sign_out();
    assert!(!console.context.session().is_authenticated());
    assert_eq!(backend.requests().len(), before);
}

// ============================================================================
// Gate Tests
// ============================================================================

#[tokio::test]
async fn test_dashboard_without_credential_redirects_to_login() {
    let backend = backend().await;
    let console = TestConsole::new(&backend).expect("Failed to build console");

    let mut gate = console.context.gate(Guard::Protected);
    assert_eq!(gate.evaluate(), Decision::ShowLoading);

    let status = console.context.start().await;
    assert_eq!(gate.sync(&status), Decision::Redirect(Route::Login));
    gate.evaluate();

    if gate.allows_render() {
        console.context.list_view().refresh().await;
    }
    assert_eq!(console.navigator.routes(), vec![Route::Login]);
    assert_eq!(backend.count("GET", "/api/containers"), 0);
}

#[tokio::test]
async fn test_unauthorized_response_clears_credential_once() {
    let backend = backend().await;
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");
    let mut credential_changes = console.context.session().subscribe();
    credential_changes.mark_unchanged();
    backend.revoke(ISSUED_TOKEN);

    let view = console.context.list_view();
    assert!(!view.refresh().await);
    assert_eq!(view.state().error.as_deref(), Some("Failed to fetch containers"));
    assert!(credential_changes.has_changed().unwrap());
    assert!(credential_changes.borrow_and_update().is_none());

    // Nothing left to clear on the next rejection
    console.context.detail_view("c1").refresh().await;
    assert!(!credential_changes.has_changed().unwrap());

    // The client never navigates; only the sign-in did
    assert_eq!(console.navigator.routes(), vec![Route::Dashboard]);

    let mut gate = console.context.gate(Guard::Protected);
    assert_eq!(
        gate.handle(GateEvent::CredentialChanged { present: false }),
        Decision::Redirect(Route::Login)
    );
    assert_eq!(
        console.navigator.routes(),
        vec![Route::Dashboard, Route::Login]
    );
}

// ============================================================================
// Container Tests
// ============================================================================

#[tokio::test]
async fn test_stop_running_container_then_refetch() {
    let backend = backend().await;
    backend.set_containers(vec![container_json("c1", "running")]);
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");

    let view = console.context.list_view();
    assert!(view.refresh().await);
    let container = view.state().containers[0].clone();
    assert_eq!(container.id, "c1");
    assert_eq!(container.ports[0].to_string(), "80:8080 (tcp)");
    assert!(view.is_action_enabled(&container, ContainerAction::Stop));
    assert!(!view.is_action_enabled(&container, ContainerAction::Start));

    assert!(view.perform("c1", ContainerAction::Stop).await);

    let requests = backend.requests();
    let stop = requests
        .iter()
        .position(|r| r.method == "POST" && r.path == "/api/containers/c1/stop")
        .expect("Stop request recorded");
    assert!(requests[stop + 1..]
        .iter()
        .any(|r| r.method == "GET" && r.path == "/api/containers"));

    let state = view.state();
    assert_eq!(state.containers[0].state, "exited");
    assert!(state.performing.is_none());
    assert!(view.is_action_enabled(&state.containers[0], ContainerAction::Start));
}

#[tokio::test]
async fn test_unknown_container_detail() {
    let backend = backend().await;
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");

    let mut view = console.context.detail_view("missing");
    assert!(!view.refresh().await);
    assert!(view.container().is_none());
    assert_eq!(view.error(), Some("Failed to fetch container details"));
}

#[tokio::test]
async fn test_detail_error_cleared_by_later_fetch() {
    let backend = backend().await;
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");

    let mut view = console.context.detail_view("c1");
    assert!(!view.refresh().await);
    assert_eq!(view.error(), Some("Failed to fetch container details"));

    backend.set_containers(vec![container_json("c1", "running")]);
    assert!(view.refresh().await);
    assert!(view.error().is_none());
    assert_eq!(view.container().map(|c| c.id.as_str()), Some("c1"));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let backend = backend().await;
    backend.set_containers(vec![container_json("c1", "running")]);
    let console = TestConsole::with_timeout(&backend, 1).expect("Failed to build console");
    console
        .context
        .session()
        .complete_sign_in(GOOD_CODE)
        .await
        .expect("Sign-in failed");
    backend.set_list_delay(Duration::from_secs(3));

    let result = console.context.api().list_containers().await;
    assert!(matches!(result, Err(Error::Timeout)));

    let view = console.context.list_view();
    assert!(!view.refresh().await);
    let state = view.state();
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Failed to fetch containers"));
    // A slow response is not a rejection
    assert!(console.context.session().is_authenticated());
}

#[tokio::test]
async fn test_action_does_not_recreate_stream() {
    let backend = backend().await;
    backend.set_containers(vec![container_json("c1", "exited")]);
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");

    let mut view = connected_view(&console, "c1").await;
    assert!(view.perform(ContainerAction::Start).await);
    assert_eq!(view.container().map(|c| c.state.as_str()), Some("running"));
    assert_eq!(backend.count("GET", "/logs"), 1);
    assert!(view.stream().is_connected());
}

// ============================================================================
// Stream Tests
// ============================================================================

#[tokio::test]
async fn test_stream_frames_and_commands() {
    let backend = backend().await;
    backend.set_containers(vec![container_json("c1", "running")]);
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");
    let mut view = connected_view(&console, "c1").await;

    view.send_command("  ls -la ").expect("Command not sent");
    next_event(&mut view).await;
    view.send_command("raw").expect("Command not sent");
    next_event(&mut view).await;
    view.send_command("fail").expect("Command not sent");
    next_event(&mut view).await;

    assert_eq!(
        &view.stream().logs()[2..],
        &[
            "$ ls -la",
            "> ran ls -la",
            "$ raw",
            "raw line",
            "$ fail",
            "ERROR: command failed"
        ]
    );
    assert_eq!(view.error(), Some("command failed"));

    let commands = backend.commands();
    assert_eq!(commands[0]["type"], "command");
    assert_eq!(commands[0]["containerId"], "c1");
    assert_eq!(commands[0]["command"], "ls -la");
}

#[tokio::test]
async fn test_stream_url_carries_credential() {
    let backend = backend().await;
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");
    let _view = connected_view(&console, "c1").await;

    let socket = backend
        .requests()
        .into_iter()
        .find(|r| r.path == "/logs")
        .expect("Socket request recorded");
    assert_eq!(socket.method, "GET");
    assert_eq!(backend.open_sockets("c1"), 1);
}

#[tokio::test]
async fn test_no_credential_never_opens_stream() {
    let backend = backend().await;
    let console = TestConsole::new(&backend).expect("Failed to build console");

    let mut view = console.context.detail_view("c1");
    view.open().await;
    assert!(!view.stream().has_connection());
    assert_eq!(view.stream().error(), Some("Failed to connect to logs stream"));
    assert_eq!(backend.count("GET", "/logs"), 0);
}

#[tokio::test]
async fn test_abnormal_close_and_reconnect() {
    let backend = backend().await;
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");
    let mut view = connected_view(&console, "c1").await;

    view.send_command("exit").expect("Command not sent");
    let event = next_event(&mut view).await;
    assert!(matches!(event, SocketEvent::Closed { code: EXIT_CLOSE_CODE, .. }));

    let stream = view.stream();
    assert!(!stream.is_connected());
    let disconnected = stream
        .logs()
        .iter()
        .filter(|l| l.as_str() == "Disconnected from log stream")
        .count();
    assert_eq!(disconnected, 1);
    assert!(stream.error().is_some());

    // Nothing goes out while disconnected
    let sent = backend.commands().len();
    assert!(matches!(
        view.send_command("ls"),
        Err(Error::StreamNotConnected)
    ));
    assert_eq!(
        view.stream().logs().last().map(String::as_str),
        Some("ERROR: Not connected to logs stream")
    );
    assert_eq!(backend.commands().len(), sent);

    assert!(view.reconnect().await);
    assert_eq!(next_event(&mut view).await, SocketEvent::Opened);
    assert!(view.stream().is_connected());
    assert!(view.stream().error().is_none());
    assert!(!view.reconnect().await);
    assert_eq!(backend.count("GET", "/logs"), 2);
}

#[tokio::test]
async fn test_rejected_socket_handshake() {
    let backend = backend().await;
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");
    backend.revoke(ISSUED_TOKEN);

    let mut view = console.context.detail_view("c1");
    view.stream_mut().open("c1").await;
    assert!(matches!(next_event(&mut view).await, SocketEvent::Error(_)));
    assert_eq!(view.stream().error(), Some("WebSocket connection error"));
    assert!(matches!(next_event(&mut view).await, SocketEvent::Closed { .. }));
    assert!(!view.stream().is_connected());
}

#[tokio::test]
async fn test_switching_container_moves_stream() {
    let backend = backend().await;
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");
    let mut view = connected_view(&console, "c1").await;

    view.navigate_to("c2").await;
    assert_eq!(next_event(&mut view).await, SocketEvent::Opened);

    eventually("old stream to close", || backend.open_sockets("c1") == 0).await;
    eventually("new stream to open", || backend.open_sockets("c2") == 1).await;
    assert_eq!(view.stream().container_id(), Some("c2"));
}

#[tokio::test]
async fn test_teardown_releases_stream() {
    let backend = backend().await;
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");
    let view = connected_view(&console, "c1").await;

    drop(view);
    eventually("stream to close", || backend.open_sockets("c1") == 0).await;
}

// ============================================================================
// Settings Tests
// ============================================================================

#[tokio::test]
async fn test_settings_repoint_running_client() {
    let backend = backend().await;
    let other = MockBackend::spawn()
        .await
        .expect("Failed to start second backend");
    other.grant(ISSUED_TOKEN);
    other.set_containers(vec![container_json("o1", "running")]);
    let console = TestConsole::signed_in(&backend).await.expect("Sign-in failed");

    console
        .context
        .settings()
        .update(SettingsPatch {
            base_url: Some(other.rest_base()),
            base_ws_url: Some(other.socket_base()),
            ..Default::default()
        })
        .expect("Failed to save settings");
    assert!(console.storage.get(SETTINGS_KEY).unwrap().is_some());

    let view = console.context.list_view();
    assert!(view.refresh().await);
    assert_eq!(view.state().containers[0].id, "o1");
    assert_eq!(other.count("GET", "/api/containers"), 1);
    assert_eq!(backend.count("GET", "/api/containers"), 0);

    console.context.settings().reset().expect("Failed to reset settings");
    assert_eq!(
        console.context.api().endpoints().rest_base,
        backend.rest_base()
    );
}

#[tokio::test]
async fn test_theme_follows_system_preference() {
    let backend = backend().await;
    let console = TestConsole::new(&backend).expect("Failed to build console");
    assert!(!console.document.is_dark());

    console.color_scheme.send_replace(ColorScheme::Dark);
    eventually("dark preference to apply", || console.document.is_dark()).await;

    console
        .context
        .settings()
        .update(SettingsPatch {
            theme: Some(Theme::Light),
            ..Default::default()
        })
        .expect("Failed to save settings");
    assert!(!console.document.is_dark());

    // No longer tracking the system preference
    console.color_scheme.send_replace(ColorScheme::Light);
    console.color_scheme.send_replace(ColorScheme::Dark);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!console.document.is_dark());
}
