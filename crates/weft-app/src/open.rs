//! Native window backed by winit and wry.
//!
//! winit owns the thread's event loop, so the core's main loop is pumped
//! from `about_to_wait` and woken through an event loop proxy.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use weft_common::WeftError;
use weft_config::WeftConfig;
use weft_webview::engine::wry::{WindowControl, WryEngine};
use weft_webview::{Application, Edge, Executor, Webview};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{ResizeDirection, Window, WindowAttributes, WindowId};

use crate::setup::{application_from, preferences_from};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

struct WinitControl(Arc<Window>);

impl WindowControl for WinitControl {
    fn drag(&self) {
        if let Err(e) = self.0.drag_window() {
            warn!(error = %e, "window drag failed");
        }
    }

    fn resize(&self, edge: Edge) {
        let Some(direction) = resize_direction(edge) else {
            warn!(bits = edge.bits(), "no resize direction for edges");
            return;
        };
        if let Err(e) = self.0.drag_resize_window(direction) {
            warn!(error = %e, "window resize failed");
        }
    }
}

fn resize_direction(edge: Edge) -> Option<ResizeDirection> {
    let vertical = if edge.contains(Edge::TOP) {
        Some(true)
    } else if edge.contains(Edge::BOTTOM) {
        Some(false)
    } else {
        None
    };
    let horizontal = if edge.contains(Edge::LEFT) {
        Some(true)
    } else if edge.contains(Edge::RIGHT) {
        Some(false)
    } else {
        None
    };

    match (vertical, horizontal) {
        (Some(true), Some(true)) => Some(ResizeDirection::NorthWest),
        (Some(true), Some(false)) => Some(ResizeDirection::NorthEast),
        (Some(false), Some(true)) => Some(ResizeDirection::SouthWest),
        (Some(false), Some(false)) => Some(ResizeDirection::SouthEast),
        (Some(true), None) => Some(ResizeDirection::North),
        (Some(false), None) => Some(ResizeDirection::South),
        (None, Some(true)) => Some(ResizeDirection::West),
        (None, Some(false)) => Some(ResizeDirection::East),
        (None, None) => None,
    }
}

struct Opener {
    config: WeftConfig,
    url: String,
    app: Application,
    window: Option<Arc<Window>>,
    webview: Option<Webview>,
}

impl Opener {
    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<(), WeftError> {
        let attributes = WindowAttributes::default().with_title("weft");
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|e| WeftError::Initialization(e.to_string()))?,
        );

        let control = WinitControl(Arc::clone(&window));
        let url = self.url.clone();
        let webview = Webview::new(&self.app, preferences_from(&self.config), |setup| {
            WryEngine::build(setup, &*window, control, &url)
        })?;

        webview.expose("version", |(): (), exec: Executor<&'static str>| {
            exec.resolve(env!("CARGO_PKG_VERSION"))
        })?;
        let title_window = Arc::clone(&window);
        webview.on::<weft_webview::kind::Title>(move |title| title_window.set_title(title))?;

        info!(webview = %webview.id(), url = %self.url, "window opened");
        self.window = Some(window);
        self.webview = Some(webview);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(webview) = self.webview.take() {
            if let Err(e) = webview.close() {
                warn!(error = %e, "webview close failed");
            }
        }
        self.window = None;
        self.app.quit();
    }
}

impl ApplicationHandler for Opener {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            error!(error = %e, "failed to open window");
            event_loop.exit();
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, _event: ()) {
        self.app.run_pending();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::CloseRequested = event {
            info!("window close requested");
            self.close();
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.app.run_pending();
        if !self.app.main_loop().is_running() {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL));
    }
}

pub fn run(config: WeftConfig, url: Option<String>) -> Result<(), WeftError> {
    let url = url
        .or_else(|| config.webview.url.clone())
        .unwrap_or_else(|| "weft://localhost/".to_string());

    let event_loop = EventLoop::new().map_err(|e| WeftError::Initialization(e.to_string()))?;
    let app = application_from(&config)?;

    let proxy = Mutex::new(event_loop.create_proxy());
    app.dispatcher().set_waker(move || {
        if let Ok(proxy) = proxy.lock() {
            let _ = proxy.send_event(());
        }
    });

    let mut opener = Opener {
        config,
        url,
        app,
        window: None,
        webview: None,
    };
    event_loop
        .run_app(&mut opener)
        .map_err(|e| WeftError::Other(e.to_string()))?;

    opener.app.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_map_to_directions() {
        assert_eq!(resize_direction(Edge::TOP), Some(ResizeDirection::North));
        assert_eq!(
            resize_direction(Edge::BOTTOM | Edge::RIGHT),
            Some(ResizeDirection::SouthEast)
        );
        assert_eq!(resize_direction(Edge::LEFT), Some(ResizeDirection::West));
    }
}
