//! The seam between the core and a platform adapter.
//!
//! Adapters implement [`NativeEngine`] (the primitives the core needs) and
//! call into [`EngineHooks`] when the native control reports something.
//! Every `NativeEngine` method is only ever called on the owning thread.

mod headless;
#[cfg(feature = "wry")]
pub mod wry;

pub use headless::{EngineCall, HeadlessEngine};

pub use crate::webview::EngineHooks;

use bitflags::bitflags;

use crate::application::Preferences;
use crate::events::WebEvent;

/// Native id of a script registered to run before page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptHandle(pub u64);

bitflags! {
    /// Window edges for an interactive resize.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Edge: u8 {
        const TOP = 1 << 0;
        const BOTTOM = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

/// Everything an adapter needs to build its native control.
pub struct EngineSetup {
    pub hooks: EngineHooks,
    /// Schemes declared on the [`Application`](crate::Application); some
    /// engines can only intercept schemes known before creation.
    pub schemes: Vec<String>,
    pub preferences: Preferences,
}

/// Primitives consumed from a platform adapter.
pub trait NativeEngine {
    fn navigate(&self, url: &str);
    fn url(&self) -> Option<String>;
    fn page_title(&self) -> String;
    fn back(&self);
    fn forward(&self);
    fn reload(&self);

    fn execute_script(&self, code: &str);
    fn add_script_before_load(&self, code: &str) -> ScriptHandle;
    fn remove_script(&self, handle: ScriptHandle);

    /// Called right before ready-phase scripts run. Engines that cannot
    /// register scripts after creation replay them here.
    fn before_dom_ready(&self) {}

    fn register_scheme_filter(&self, pattern: &str);
    fn unregister_scheme_filter(&self, pattern: &str);

    /// Deliver a bridge message to the page runtime.
    fn post_message(&self, text: &str);

    /// Attach or detach the native notification behind a lazy event kind.
    fn subscribe(&self, event: WebEvent);
    fn unsubscribe(&self, event: WebEvent);

    fn start_drag(&self);
    fn start_resize(&self, edge: Edge);

    fn dev_tools(&self) -> bool;
    fn set_dev_tools(&self, enabled: bool);
    fn context_menu(&self) -> bool;
    fn set_context_menu(&self, enabled: bool);
}
