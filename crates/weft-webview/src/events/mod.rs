//! Typed event bus for webview lifecycle notifications.
//!
//! Each event kind has its own strongly typed [`Listeners`] container.
//! Callers pick a kind with a marker type from [`kind`] (for typed
//! registration) or with the [`WebEvent`] tag (for kind-generic
//! operations such as `clear` and `empty`).

mod listeners;

pub use listeners::Listeners;

use serde::{Deserialize, Serialize};

/// Tag for each event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebEvent {
    DomReady,
    Navigated,
    Navigate,
    Favicon,
    Title,
    Load,
}

impl WebEvent {
    pub const ALL: [WebEvent; 6] = [
        WebEvent::DomReady,
        WebEvent::Navigated,
        WebEvent::Navigate,
        WebEvent::Favicon,
        WebEvent::Title,
        WebEvent::Load,
    ];

    /// Kinds whose native notification is only attached while someone
    /// listens.
    pub fn is_lazy(self) -> bool {
        matches!(self, WebEvent::Navigated | WebEvent::Title | WebEvent::Load)
    }
}

/// A pending navigation, either in place or into a new window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub url: String,
    pub new_window: bool,
}

/// Decision returned by `Navigate` listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    #[default]
    Allow,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Started,
    Finished,
}

/// Raw favicon bytes as handed over by the engine; decoding is left to the
/// embedder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icon {
    pub data: Vec<u8>,
}

impl Icon {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// =============================================================================
// KINDS
// =============================================================================

/// Binds a marker type to its tag, argument and result types.
pub trait EventKind: 'static {
    const TAG: WebEvent;
    type Args: 'static;
    type Output: 'static;

    fn listeners(events: &WebEvents) -> &Listeners<Self::Args, Self::Output>;
}

pub mod kind {
    use super::*;

    macro_rules! event_kind {
        ($name:ident, $field:ident, $args:ty, $output:ty) => {
            pub struct $name;

            impl EventKind for $name {
                const TAG: WebEvent = WebEvent::$name;
                type Args = $args;
                type Output = $output;

                fn listeners(events: &WebEvents) -> &Listeners<$args, $output> {
                    &events.$field
                }
            }
        };
    }

    event_kind!(DomReady, dom_ready, (), ());
    event_kind!(Navigated, navigated, String, ());
    event_kind!(Navigate, navigate, Navigation, Policy);
    event_kind!(Favicon, favicon, Icon, ());
    event_kind!(Title, title, String, ());
    event_kind!(Load, load, LoadState, ());
}

// =============================================================================
// BUS
// =============================================================================

#[derive(Debug, Default)]
pub struct WebEvents {
    pub dom_ready: Listeners<()>,
    pub navigated: Listeners<String>,
    pub navigate: Listeners<Navigation, Policy>,
    pub favicon: Listeners<Icon>,
    pub title: Listeners<String>,
    pub load: Listeners<LoadState>,
}

impl WebEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<E: EventKind>(&self) -> &Listeners<E::Args, E::Output> {
        E::listeners(self)
    }

    pub fn empty(&self, event: WebEvent) -> bool {
        match event {
            WebEvent::DomReady => self.dom_ready.empty(),
            WebEvent::Navigated => self.navigated.empty(),
            WebEvent::Navigate => self.navigate.empty(),
            WebEvent::Favicon => self.favicon.empty(),
            WebEvent::Title => self.title.empty(),
            WebEvent::Load => self.load.empty(),
        }
    }

    pub fn remove(&self, event: WebEvent, id: u64) -> bool {
        match event {
            WebEvent::DomReady => self.dom_ready.remove(id),
            WebEvent::Navigated => self.navigated.remove(id),
            WebEvent::Navigate => self.navigate.remove(id),
            WebEvent::Favicon => self.favicon.remove(id),
            WebEvent::Title => self.title.remove(id),
            WebEvent::Load => self.load.remove(id),
        }
    }

    pub fn clear(&self, event: WebEvent) {
        match event {
            WebEvent::DomReady => self.dom_ready.clear(),
            WebEvent::Navigated => self.navigated.clear(),
            WebEvent::Navigate => self.navigate.clear(),
            WebEvent::Favicon => self.favicon.clear(),
            WebEvent::Title => self.title.clear(),
            WebEvent::Load => self.load.clear(),
        }
    }

    pub fn clear_all(&self) {
        for event in WebEvent::ALL {
            self.clear(event);
        }
    }
}
