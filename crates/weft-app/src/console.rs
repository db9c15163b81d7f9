//! Headless bridge console.
//!
//! Each stdin line is either a raw wire message from the "page" or a
//! `:`-prefixed command that plays the engine's part. Everything the core
//! asks the engine to do is printed to stdout.

use std::io::BufRead;

use serde_json::Value;
use tracing::{debug, info, warn};
use weft_common::WeftError;
use weft_config::WeftConfig;
use weft_webview::{
    EngineCall, Executor, HeadlessEngine, ParamList, SchemeError, SchemeReply, SchemeRequest, Webview,
    INTERNAL_SCHEME,
};

use crate::setup::{application_from, preferences_from};

const INDEX_PAGE: &str = "<!doctype html><title>weft</title><p>weft console</p>";

#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// Raw bridge message as the page runtime would post it.
    Message(String),
    Call { name: String, args: Vec<Value> },
    Navigate(String),
    Ready,
    Title(String),
    Get(String),
    Quit,
}

fn parse_line(line: &str) -> Result<Line, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Line::Message(line.to_string()));
    };

    let (verb, rest) = command.split_once(' ').unwrap_or((command, ""));
    let rest = rest.trim();
    match verb {
        "call" => {
            let (name, args) = rest.split_once(' ').unwrap_or((rest, "[]"));
            if name.is_empty() {
                return Err("usage: :call <name> [json array]".into());
            }
            let args: Vec<Value> = serde_json::from_str(args)
                .map_err(|e| format!("call arguments must be a JSON array: {e}"))?;
            Ok(Line::Call {
                name: name.to_string(),
                args,
            })
        }
        "nav" if !rest.is_empty() => Ok(Line::Navigate(rest.to_string())),
        "ready" => Ok(Line::Ready),
        "title" => Ok(Line::Title(rest.to_string())),
        "get" if !rest.is_empty() => Ok(Line::Get(rest.to_string())),
        "quit" => Ok(Line::Quit),
        other => Err(format!("unknown command :{other}")),
    }
}

fn print_call(call: &EngineCall) {
    match call {
        EngineCall::PostMessage(text) => println!("<- {text}"),
        EngineCall::Execute(code) => println!("exec {code}"),
        EngineCall::Navigate(url) => println!("navigate {url}"),
        EngineCall::AddScript(handle, _) => println!("script {} registered", handle.0),
        other => debug!(?other, "engine call"),
    }
}

fn expose_builtins(webview: &Webview) -> Result<(), WeftError> {
    webview.expose("echo", |(text,): (String,), exec: Executor<String>| {
        exec.resolve(text)
    })?;
    webview.expose("add", |(a, b): (f64, f64), exec: Executor<f64>| exec.resolve(a + b))?;
    webview.expose("version", |(): (), exec: Executor<&'static str>| {
        exec.resolve(env!("CARGO_PKG_VERSION"))
    })?;
    webview.handle_scheme(INTERNAL_SCHEME, |request: &SchemeRequest| {
        match request.path().trim_start_matches("localhost").trim_matches('/') {
            "" | "index.html" => Ok(SchemeReply::new(INDEX_PAGE, "text/html")),
            _ => Err(SchemeError::NotFound),
        }
    })?;
    Ok(())
}

/// Handle one stdin line. Returns `false` to stop reading.
fn handle(webview: &Webview, runtime: &tokio::runtime::Handle, line: Line) -> bool {
    let hooks = webview.hooks();
    match line {
        Line::Message(text) if text.is_empty() => {}
        Line::Message(text) => {
            if !hooks.on_message(&text) {
                println!("!! dropped");
            }
        }
        Line::Call { name, args } => {
            let future = webview.call::<Value>(&name, ParamList(args));
            runtime.spawn(async move {
                match future.await {
                    Ok(value) => println!("=> {name}: {value}"),
                    Err(err) => println!("=> {name} failed: {err}"),
                }
            });
        }
        Line::Navigate(url) => {
            if hooks.on_navigation_started(&url) {
                println!("!! navigation to {url} blocked");
            } else if let Err(err) = webview.set_url(url) {
                warn!(error = %err, "navigate failed");
            }
        }
        Line::Ready => {
            hooks.on_dom_ready();
            hooks.on_navigation_finished();
        }
        Line::Title(title) => hooks.on_title_changed(&title),
        Line::Get(url) => match hooks.on_scheme_request(SchemeRequest::get(url)) {
            Some(response) => println!(
                "{} {} ({} bytes)",
                response.status,
                response.reason,
                response.body.len()
            ),
            None => println!("not intercepted"),
        },
        Line::Quit => return false,
    }
    true
}

pub fn run(config: &WeftConfig) -> Result<(), WeftError> {
    let app = application_from(config)?;
    let preferences = preferences_from(config);
    let engine = HeadlessEngine::with_preferences(&preferences);
    engine.set_observer(print_call);

    let webview = Webview::new(&app, preferences, move |_setup| Ok(engine))?;
    expose_builtins(&webview)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let rt = runtime.handle().clone();

    let remote = webview.clone();
    let dispatcher = app.dispatcher();
    let reader = std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_line(&line) {
                Ok(line) => {
                    if !handle(&remote, &rt, line) {
                        break;
                    }
                }
                Err(err) => println!("!! {err}"),
            }
        }
        dispatcher.quit();
    });

    info!(webview = %webview.id(), "console ready");
    app.run();

    webview.close()?;
    app.shutdown();
    if reader.join().is_err() {
        warn!("stdin reader panicked");
    }
    runtime.shutdown_background();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_lines_are_wire_messages() {
        assert_eq!(
            parse_line(r#" {"drag": true} "#),
            Ok(Line::Message(r#"{"drag": true}"#.into()))
        );
    }

    #[test]
    fn call_arguments_default_to_empty() {
        assert_eq!(
            parse_line(":call greet"),
            Ok(Line::Call {
                name: "greet".into(),
                args: vec![]
            })
        );
        assert_eq!(
            parse_line(r#":call add [1, 2]"#),
            Ok(Line::Call {
                name: "add".into(),
                args: vec![json!(1), json!(2)]
            })
        );
        assert!(parse_line(r#":call add {"a": 1}"#).is_err());
    }

    #[test]
    fn engine_commands() {
        assert_eq!(parse_line(":nav https://example.org"), Ok(Line::Navigate("https://example.org".into())));
        assert_eq!(parse_line(":ready"), Ok(Line::Ready));
        assert_eq!(parse_line(":title Hello world"), Ok(Line::Title("Hello world".into())));
        assert_eq!(parse_line(":get weft://localhost/"), Ok(Line::Get("weft://localhost/".into())));
        assert_eq!(parse_line(":quit"), Ok(Line::Quit));
        assert!(parse_line(":nav").is_err());
        assert!(parse_line(":bogus").is_err());
    }

    #[test]
    fn builtins_answer_the_page() {
        let app = weft_webview::Application::new();
        let engine = HeadlessEngine::new();
        let native = engine.clone();
        let webview = Webview::new(&app, Default::default(), move |_| Ok(native)).unwrap();
        expose_builtins(&webview).unwrap();

        let hooks = webview.hooks();
        hooks.on_message(r#"{"id": 1, "name": "add", "params": [2, 2.5]}"#);
        let posted: Vec<Value> = engine
            .posted()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect();
        assert_eq!(posted, vec![json!({"id": 1, "result": 4.5})]);

        let index = hooks
            .on_scheme_request(SchemeRequest::get("weft://localhost/index.html"))
            .unwrap();
        assert_eq!(index.status, 200);
        let missing = hooks
            .on_scheme_request(SchemeRequest::get("weft://localhost/nope"))
            .unwrap();
        assert_eq!(missing.status, 404);
    }
}
