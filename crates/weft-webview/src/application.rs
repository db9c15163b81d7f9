//! Process-level context shared by every webview on the owning thread.
//!
//! Owns the main loop and the list of custom schemes that must be known to
//! the engine before any webview exists.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};
use weft_common::{is_valid_scheme_name, InstanceId};

use crate::bridge::runtime::DEFAULT_GLOBAL;
use crate::dispatch::{Dispatcher, MainLoop};
use crate::error::WebviewError;

/// The scheme every application registers.
pub const INTERNAL_SCHEME: &str = "weft";

/// Directory used for persistent storage when none is configured.
pub const DEFAULT_STORAGE_DIR: &str = ".weft";

/// Maximum size of a single inbound bridge message, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Per-webview settings handed to the engine at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub user_agent: Option<String>,
    pub dev_tools: bool,
    pub context_menu: bool,
    pub hardware_acceleration: bool,
    pub persistent_cookies: bool,
    pub storage_path: Option<PathBuf>,
    pub browser_flags: Vec<String>,
    /// Name of the page global that exposes the bridge runtime.
    pub bridge_global: String,
    pub max_message_size: usize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            user_agent: None,
            dev_tools: cfg!(debug_assertions),
            context_menu: true,
            hardware_acceleration: true,
            persistent_cookies: false,
            storage_path: None,
            browser_flags: Vec::new(),
            bridge_global: DEFAULT_GLOBAL.to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl Preferences {
    /// Browser flags including the ones implied by other settings.
    pub fn effective_flags(&self) -> Vec<String> {
        let mut flags = self.browser_flags.clone();
        if !self.hardware_acceleration && !flags.iter().any(|f| f == "--disable-gpu") {
            flags.push("--disable-gpu".to_string());
        }
        flags
    }

    /// Where cookies and site data live, if they persist at all.
    pub fn effective_storage_path(&self) -> Option<PathBuf> {
        if !self.persistent_cookies {
            return None;
        }
        Some(
            self.storage_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
        )
    }
}

/// Owns the main loop. Create one at startup, on the thread that will own
/// every native control, and pass it by reference to [`Webview::new`].
///
/// [`Webview::new`]: crate::Webview::new
pub struct Application {
    id: InstanceId,
    main_loop: MainLoop,
    dispatcher: Dispatcher,
    schemes: RefCell<Vec<String>>,
    webviews: Cell<usize>,
}

impl Application {
    pub fn new() -> Self {
        let (main_loop, dispatcher) = MainLoop::new();
        let id = InstanceId::new();
        info!(app = %id, "application started");
        Self {
            id,
            main_loop,
            dispatcher,
            schemes: RefCell::new(vec![INTERNAL_SCHEME.to_string()]),
            webviews: Cell::new(0),
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    /// Declare a custom scheme to the engines of webviews created from now on.
    pub fn register_scheme(&self, name: &str) -> Result<(), WebviewError> {
        if !is_valid_scheme_name(name) {
            return Err(WebviewError::InvalidScheme(name.to_string()));
        }
        let name = name.to_ascii_lowercase();
        if self.webviews.get() > 0 {
            warn!(scheme = %name, "scheme registered after a webview was created");
        }

        let mut schemes = self.schemes.borrow_mut();
        if !schemes.iter().any(|s| *s == name) {
            schemes.push(name);
        }
        Ok(())
    }

    pub fn schemes(&self) -> Vec<String> {
        self.schemes.borrow().clone()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub fn main_loop(&self) -> &MainLoop {
        &self.main_loop
    }

    pub fn run(&self) {
        self.main_loop.run();
    }

    pub fn run_pending(&self) -> usize {
        self.main_loop.run_pending()
    }

    pub fn run_for(&self, timeout: Duration) -> usize {
        self.main_loop.run_for(timeout)
    }

    pub fn quit(&self) {
        self.main_loop.quit();
    }

    /// Stop the loop. Blocking calls from other threads fail from here on.
    pub fn shutdown(&self) {
        info!(app = %self.id, "application shutting down");
        self.main_loop.stop();
    }

    pub(crate) fn webview_created(&self) {
        self.webviews.set(self.webviews.get() + 1);
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}
