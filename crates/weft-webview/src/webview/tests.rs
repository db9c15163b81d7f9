use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use super::*;
use crate::engine::{Edge, EngineCall, HeadlessEngine};
use crate::events::{kind, LoadState, Navigation, Policy};

fn setup() -> (Application, Webview, HeadlessEngine) {
    setup_with(Preferences::default())
}

fn setup_with(preferences: Preferences) -> (Application, Webview, HeadlessEngine) {
    let app = Application::new();
    let engine = HeadlessEngine::new();
    let native = engine.clone();
    let webview = Webview::new(&app, preferences, move |_setup| Ok(native)).unwrap();
    (app, webview, engine)
}

fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    (seen, move |value: &T| s.lock().unwrap().push(value.clone()))
}

fn posted(engine: &HeadlessEngine) -> Vec<Value> {
    engine
        .posted()
        .iter()
        .map(|text| serde_json::from_str(text).unwrap())
        .collect()
}

/// Drive the main loop until `worker` finishes, then return its result.
fn pump<T>(app: &Application, worker: thread::JoinHandle<T>) -> T {
    while !worker.is_finished() {
        app.run_for(Duration::from_millis(5));
    }
    worker.join().unwrap()
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

#[test]
fn runtime_is_injected_and_survives_clear() {
    let (_app, webview, engine) = setup();
    let scripts = engine.scripts();
    assert_eq!(scripts.len(), 1);
    assert!(scripts[0].contains("window.weft = {"));

    webview.inject(Script::new("user()")).unwrap();
    assert_eq!(engine.scripts().len(), 2);

    webview.clear_scripts().unwrap();
    let scripts = engine.scripts();
    assert_eq!(scripts.len(), 1);
    assert!(scripts[0].contains("window.weft = {"));
}

#[test]
fn custom_bridge_global() {
    let (_app, _webview, engine) = setup_with(Preferences {
        bridge_global: "native".into(),
        ..Preferences::default()
    });
    assert!(engine.scripts()[0].contains("window.native = {"));
}

#[test]
fn factory_failure_is_initialization_error() {
    let app = Application::new();
    let result = Webview::new(&app, Preferences::default(), |_setup| {
        Err::<HeadlessEngine, _>(WebviewError::Engine("no display".into()))
    });
    assert!(matches!(result, Err(WebviewError::Initialization(msg)) if msg.contains("no display")));
}

#[test]
fn factory_receives_application_schemes() {
    let app = Application::new();
    app.register_scheme("app").unwrap();

    let seen = std::cell::RefCell::new(Vec::new());
    Webview::new(&app, Preferences::default(), |setup| {
        *seen.borrow_mut() = setup.schemes.clone();
        Ok(HeadlessEngine::with_preferences(&setup.preferences))
    })
    .unwrap();
    assert_eq!(*seen.borrow(), vec!["weft".to_string(), "app".to_string()]);
}

// =============================================================================
// THREAD AFFINITY
// =============================================================================

#[test]
fn off_thread_calls_run_on_owner() {
    let (app, webview, engine) = setup();
    let remote = webview.clone();

    let worker = thread::spawn(move || {
        assert!(!remote.is_thread_safe());
        remote.set_url("https://example.org")?;
        remote.url()
    });

    assert_eq!(pump(&app, worker).unwrap(), Some("https://example.org".into()));
    assert_eq!(
        engine.calls().last(),
        Some(&EngineCall::Navigate("https://example.org".into()))
    );
}

#[test]
fn off_thread_listener_registration() {
    let (app, webview, engine) = setup();
    let remote = webview.clone();
    let (titles, record) = recorder::<String>();

    let worker = thread::spawn(move || remote.on::<kind::Title>(record));
    pump(&app, worker).unwrap();

    assert!(engine.is_subscribed(WebEvent::Title));
    webview.hooks().on_title_changed("Hello");
    assert_eq!(*titles.lock().unwrap(), vec!["Hello".to_string()]);
}

#[test]
fn calls_fail_once_loop_is_stopped() {
    let (app, webview, _engine) = setup();
    app.shutdown();

    assert!(matches!(webview.set_url("about:blank"), Err(WebviewError::NotRunning)));

    let remote = webview.clone();
    let result = thread::spawn(move || remote.reload()).join().unwrap();
    assert!(matches!(result, Err(WebviewError::NotRunning)));
}

#[tokio::test]
async fn call_after_shutdown_is_not_running() {
    let (app, webview, _engine) = setup();
    app.shutdown();
    let result = webview.call::<u8>("f", ()).await;
    assert_eq!(result, Err(CallError::NotRunning));
}

// =============================================================================
// BRIDGE ROUTING
// =============================================================================

#[test]
fn page_call_reaches_exposed_function() {
    let (_app, webview, engine) = setup();
    webview
        .expose("add", |(a, b): (i64, i64), exec: Executor<i64>| exec.resolve(a + b))
        .unwrap();

    assert!(webview.hooks().on_message(r#"{"id": 1, "name": "add", "params": [1, 2]}"#));
    assert_eq!(posted(&engine), vec![json!({"id": 1, "result": 3})]);
}

#[test]
fn executor_resolved_off_thread_posts_on_owner() {
    let (app, webview, engine) = setup();
    let parked = Arc::new(Mutex::new(None));
    let p = Arc::clone(&parked);
    webview
        .expose("slow", move |(): (), exec: Executor<String>| {
            *p.lock().unwrap() = Some(exec);
        })
        .unwrap();

    webview.hooks().on_message(r#"{"id": 7, "name": "slow", "params": []}"#);
    let exec = parked.lock().unwrap().take().unwrap();
    thread::spawn(move || exec.resolve("done".into())).join().unwrap();
    assert!(engine.posted().is_empty());

    app.run_pending();
    assert_eq!(posted(&engine), vec![json!({"id": 7, "result": "done"})]);
}

#[test]
fn reserved_messages_drive_the_window() {
    let (_app, webview, engine) = setup();
    let hooks = webview.hooks();

    assert!(hooks.on_message(r#"{"resize": 10}"#));
    assert!(hooks.on_message(r#"{"drag": true}"#));

    let window: Vec<EngineCall> = engine
        .calls()
        .into_iter()
        .filter(|c| matches!(c, EngineCall::StartDrag | EngineCall::StartResize(_)))
        .collect();
    assert_eq!(
        window,
        vec![EngineCall::StartResize(Edge::BOTTOM | Edge::RIGHT), EngineCall::StartDrag]
    );
    assert_eq!(webview.pending_calls().unwrap(), 0);
}

#[test]
fn malformed_and_oversized_messages_are_dropped() {
    let (_app, webview, engine) = setup_with(Preferences {
        max_message_size: 64,
        ..Preferences::default()
    });
    webview
        .expose("echo", |(s,): (String,), exec: Executor<String>| exec.resolve(s))
        .unwrap();
    let hooks = webview.hooks();

    assert!(!hooks.on_message("not json"));
    assert!(!hooks.on_message(r#"{"id": 1}"#));

    let big = format!(r#"{{"id": 2, "name": "echo", "params": ["{}"]}}"#, "x".repeat(64));
    assert!(!hooks.on_message(&big));
    assert!(engine.posted().is_empty());
}

#[tokio::test]
async fn native_call_round_trip() {
    let (_app, webview, engine) = setup();
    let future = webview.call::<String>("greet", ("ada",));

    assert_eq!(
        posted(&engine),
        vec![json!({"id": 1, "name": "greet", "params": ["ada"]})]
    );
    webview.hooks().on_message(r#"{"id": 1, "result": "hi ada"}"#);
    assert_eq!(future.await, Ok("hi ada".to_string()));
}

#[tokio::test]
async fn close_cancels_pending_calls() {
    let (_app, webview, engine) = setup();
    webview.on::<kind::Title>(|_| {}).unwrap();
    webview.handle_scheme("app", |_| Err(SchemeError::NotFound)).unwrap();
    let future = webview.call::<u8>("f", ());

    webview.close().unwrap();
    assert_eq!(future.await, Err(CallError::Cancelled));
    assert!(!engine.is_subscribed(WebEvent::Title));
    assert!(engine.filters().is_empty());
    assert!(matches!(webview.reload(), Err(WebviewError::NotRunning)));
}

#[tokio::test]
async fn last_handle_dropped_off_thread_tears_down_on_owner() {
    let (app, webview, engine) = setup();
    webview.handle_scheme("app", |_| Err(SchemeError::NotFound)).unwrap();
    let future = webview.call::<u8>("f", ());

    thread::spawn(move || drop(webview)).join().unwrap();
    assert_eq!(engine.filters().len(), 1);

    app.run_pending();
    let result = tokio::time::timeout(Duration::from_millis(500), future).await;
    assert_eq!(result.ok(), Some(Err(CallError::Cancelled)));
    assert!(engine.filters().is_empty());
}

#[test]
fn unhandled_hook_sees_unknown_function() {
    let (_app, webview, _engine) = setup();
    let (seen, record) = recorder::<Unhandled>();
    webview.set_unhandled_hook(record).unwrap();
    webview.hooks().on_message(r#"{"id": 3, "name": "missing", "params": []}"#);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Unhandled::UnknownFunction { id: 3, name: "missing".into() }]
    );
}

// =============================================================================
// EVENTS AND LIFECYCLE
// =============================================================================

#[test]
fn lazy_kinds_subscribe_on_first_listener() {
    let (_app, webview, engine) = setup();

    webview.on::<kind::DomReady>(|_| {}).unwrap();
    assert!(!engine.is_subscribed(WebEvent::DomReady));

    let first = webview.on::<kind::Load>(|_| {}).unwrap();
    webview.on::<kind::Load>(|_| {}).unwrap();
    let subscribes = engine
        .calls()
        .iter()
        .filter(|c| **c == EngineCall::Subscribe(WebEvent::Load))
        .count();
    assert_eq!(subscribes, 1);

    assert!(webview.off(WebEvent::Load, first).unwrap());
    assert!(engine.is_subscribed(WebEvent::Load));

    webview.clear(WebEvent::Load).unwrap();
    assert!(!engine.is_subscribed(WebEvent::Load));

    webview.once::<kind::Load>(|_| {}).unwrap();
    assert!(engine.is_subscribed(WebEvent::Load));
}

#[test]
fn blocked_navigation_keeps_page_state() {
    let (_app, webview, engine) = setup();
    let (loads, record) = recorder::<LoadState>();
    webview.on::<kind::Load>(record).unwrap();
    webview
        .on::<kind::Navigate>(|nav: &Navigation| {
            if nav.url.contains("blocked") {
                Policy::Block
            } else {
                Policy::Allow
            }
        })
        .unwrap();

    let hooks = webview.hooks();
    hooks.on_dom_ready();

    assert!(hooks.on_navigation_started("https://blocked.example"));
    webview.execute("still_ready()").unwrap();
    assert_eq!(engine.executed(), vec!["still_ready()"]);
    assert!(loads.lock().unwrap().is_empty());

    assert!(!hooks.on_navigation_started("https://fine.example"));
    webview.execute("queued()").unwrap();
    assert_eq!(engine.executed(), vec!["still_ready()"]);
    assert_eq!(*loads.lock().unwrap(), vec![LoadState::Started]);

    hooks.on_navigation_finished();
    assert_eq!(*loads.lock().unwrap(), vec![LoadState::Started, LoadState::Finished]);
}

#[test]
fn new_window_is_offered_to_navigate_listeners() {
    let (_app, webview, _engine) = setup();
    let (seen, record) = recorder::<Navigation>();
    webview
        .on::<kind::Navigate>(move |nav: &Navigation| {
            record(nav);
            Policy::Block
        })
        .unwrap();

    assert!(webview.hooks().on_new_window("https://popup.example"));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Navigation {
            url: "https://popup.example".into(),
            new_window: true
        }]
    );
}

#[test]
fn dom_ready_runs_scripts_before_listeners() {
    let (_app, webview, engine) = setup();
    let log = Arc::new(Mutex::new(Vec::new()));

    let l = Arc::clone(&log);
    engine.set_observer(move |call| {
        if let EngineCall::Execute(code) = call {
            l.lock().unwrap().push(code.clone());
        }
    });
    let l = Arc::clone(&log);
    webview
        .on::<kind::DomReady>(move |_| l.lock().unwrap().push("listener".to_string()))
        .unwrap();

    webview
        .inject(Script::new("ready()").at(LoadTime::Ready))
        .unwrap();
    webview.execute("queued()").unwrap();
    assert!(log.lock().unwrap().is_empty());

    webview.hooks().on_dom_ready();
    assert_eq!(*log.lock().unwrap(), vec!["ready()", "queued()", "listener"]);
}

#[test]
fn favicon_is_stored_and_announced() {
    let (_app, webview, _engine) = setup();
    let (icons, record) = recorder::<Icon>();
    webview.on::<kind::Favicon>(record).unwrap();

    let icon = Icon { data: vec![1, 2, 3] };
    webview.hooks().on_favicon_changed(icon.clone());
    assert_eq!(webview.favicon().unwrap(), icon);
    assert_eq!(*icons.lock().unwrap(), vec![icon]);
}

#[test]
fn source_change_fires_navigated() {
    let (_app, webview, _engine) = setup();
    let (urls, record) = recorder::<String>();
    webview.on::<kind::Navigated>(record).unwrap();
    webview.hooks().on_source_changed("https://example.org/next");
    assert_eq!(*urls.lock().unwrap(), vec!["https://example.org/next".to_string()]);
}

#[test]
fn set_file_uses_absolute_file_url() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("index.html");
    std::fs::write(&page, "<html></html>").unwrap();

    let (_app, webview, _engine) = setup();
    webview.set_file(&page).unwrap();

    let url = webview.url().unwrap().unwrap();
    assert!(url.starts_with("file:///"));
    assert!(url.ends_with("/index.html"));

    assert!(matches!(
        webview.set_file(dir.path().join("missing.html")),
        Err(WebviewError::Io(_))
    ));
}

#[test]
fn toggles_reach_the_engine() {
    let (_app, webview, _engine) = setup();
    webview.set_dev_tools(true).unwrap();
    webview.set_context_menu(false).unwrap();
    assert!(webview.dev_tools().unwrap());
    assert!(!webview.context_menu().unwrap());
}

// =============================================================================
// SCHEMES
// =============================================================================

#[test]
fn scheme_requests_are_answered() {
    let (_app, webview, engine) = setup();
    assert!(webview
        .handle_scheme("app", |req| {
            Ok(SchemeReply::new(req.path().as_bytes().to_vec(), "text/plain"))
        })
        .unwrap());
    assert!(!webview.handle_scheme("app", |_| Err(SchemeError::Denied)).unwrap());
    assert_eq!(engine.filters(), vec!["app:*".to_string()]);

    let hooks = webview.hooks();
    let response = hooks
        .on_scheme_request(SchemeRequest::get("app://host/index.html"))
        .unwrap();
    assert_eq!(response.status, 200);
    assert!(hooks.on_scheme_request(SchemeRequest::get("other://x")).is_none());

    assert!(webview.remove_scheme("app").unwrap());
    assert!(hooks.on_scheme_request(SchemeRequest::get("app://host/")).is_none());
}

#[test]
fn invalid_scheme_name_is_rejected() {
    let (_app, webview, _engine) = setup();
    assert!(matches!(
        webview.handle_scheme("bad name", |_| Err(SchemeError::Failed)),
        Err(WebviewError::InvalidScheme(_))
    ));
}

#[test]
fn hooks_outlive_webview_harmlessly() {
    let (_app, webview, _engine) = setup();
    let hooks = webview.hooks();
    drop(webview);
    assert!(!hooks.on_message(r#"{"drag": true}"#));
    assert!(!hooks.on_navigation_started("https://example.org"));
}
