//! Embedding core for native webviews.
//!
//! Provides:
//! - A main loop that owns every native control, with a thread-safe
//!   dispatcher for marshaling calls onto it
//! - A JSON RPC bridge between page script and native functions
//! - Typed page events with lazy native subscription
//! - Script injection that follows the page lifecycle
//! - Custom URI scheme interception
//!
//! The platform side is abstracted behind [`NativeEngine`]. The `wry`
//! feature enables an adapter over the `wry` crate; [`HeadlessEngine`]
//! records every primitive and needs no display.

pub mod application;
pub mod bridge;
pub mod codec;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod schemes;
pub mod scripts;
pub mod webview;

pub use application::{Application, Preferences, INTERNAL_SCHEME};
pub use bridge::{CallError, CallFuture, Executor, Unhandled};
pub use codec::{decode, encode, Arguments, DecodeError, ParamList, Parameters};
pub use dispatch::{Dispatcher, MainLoop, NotRunning};
pub use engine::{Edge, EngineCall, EngineHooks, EngineSetup, HeadlessEngine, NativeEngine};
pub use error::WebviewError;
pub use events::{kind, Icon, LoadState, Navigation, Policy, WebEvent};
pub use schemes::{SchemeError, SchemeReply, SchemeRequest, SchemeResponse};
pub use scripts::{FrameScope, LoadTime, Script};
pub use webview::Webview;
