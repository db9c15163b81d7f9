//! The RPC bridge between page script and native code.
//!
//! Native functions are bound to names with [`Bridge::expose`] and invoked
//! by `Call` messages from the page. Native code calls into the page with
//! [`Bridge::call`], which returns a [`CallFuture`] fulfilled by the
//! matching `Result` message.

mod executor;
pub mod message;
pub mod runtime;


pub use executor::Executor;
pub use message::{Call, Message, Reply};

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use weft_common::IdSequence;

use crate::codec::{self, Arguments, DecodeError, Parameters};

/// Where outbound message text goes. Callable from any thread.
pub type Outbox = Arc<dyn Fn(String) + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The page answered with an error.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The bridge was torn down before an answer arrived.
    #[error("call cancelled")]
    Cancelled,

    #[error("owning thread is no longer running")]
    NotRunning,
}

/// A message that named nothing this bridge knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unhandled {
    UnknownFunction { id: u64, name: String },
    UnknownCall { id: u64 },
}

/// Resolves to the page's answer to a [`Bridge::call`].
#[must_use = "a call future does nothing unless awaited"]
pub struct CallFuture<R> {
    rx: oneshot::Receiver<Result<R, CallError>>,
}

impl<R> CallFuture<R> {
    pub(crate) fn failed(error: CallError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(error));
        Self { rx }
    }
}

impl<R> Future for CallFuture<R> {
    type Output = Result<R, CallError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(CallError::Cancelled)))
    }
}

type Function = Rc<dyn Fn(u64, &str)>;
type Pending = Box<dyn FnOnce(Result<&str, CallError>)>;

pub struct Bridge {
    functions: RefCell<HashMap<String, Function>>,
    pending: RefCell<HashMap<u64, Pending>>,
    ids: IdSequence,
    outbox: Outbox,
    unhandled: RefCell<Option<Rc<dyn Fn(&Unhandled)>>>,
}

impl Bridge {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            functions: RefCell::new(HashMap::new()),
            pending: RefCell::new(HashMap::new()),
            ids: IdSequence::new(),
            outbox,
            unhandled: RefCell::new(None),
        }
    }

    // =========================================================================
    // PAGE -> NATIVE
    // =========================================================================

    /// Bind `function` to `name`, replacing any previous binding.
    ///
    /// Parameters are decoded from the call's argument list; a decode
    /// failure rejects the call with the decode error's text and never
    /// reaches `function`.
    pub fn expose<A, R, F>(&self, name: impl Into<String>, function: F)
    where
        A: Arguments + 'static,
        R: Serialize + 'static,
        F: Fn(A, Executor<R>) + 'static,
    {
        let name = name.into();
        let outbox = Arc::clone(&self.outbox);
        let bound = name.clone();

        let wrapped = move |id: u64, params: &str| {
            let executor = Executor::new(id, &bound, Arc::clone(&outbox));
            match A::decode_args(params) {
                Ok(args) => function(args, executor),
                Err(err) => {
                    warn!(id, function = %bound, error = %err, "rejecting call with bad arguments");
                    executor.reject(err.to_string());
                }
            }
        };

        if self
            .functions
            .borrow_mut()
            .insert(name.clone(), Rc::new(wrapped))
            .is_some()
        {
            debug!(function = %name, "replaced exposed function");
        }
    }

    pub fn unexpose(&self, name: &str) -> bool {
        self.functions.borrow_mut().remove(name).is_some()
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        self.functions.borrow().contains_key(name)
    }

    pub fn handle_incoming(&self, call: Call) {
        let function = self.functions.borrow().get(&call.name).cloned();
        match function {
            Some(function) => {
                debug!(id = call.id, function = %call.name, "incoming call");
                function(call.id, call.params.get());
            }
            None => {
                debug!(id = call.id, function = %call.name, "call for unknown function dropped");
                self.report(Unhandled::UnknownFunction {
                    id: call.id,
                    name: call.name,
                });
            }
        }
    }

    // =========================================================================
    // NATIVE -> PAGE
    // =========================================================================

    /// Call the page function `name`. `args` is a tuple with one element per parameter.
    pub fn call<R>(&self, name: &str, args: impl Parameters) -> CallFuture<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let id = self.ids.next_id();
        let (tx, rx) = oneshot::channel();

        let complete: Pending = Box::new(move |outcome| {
            let result = outcome.and_then(|text| codec::decode::<R>(text).map_err(CallError::from));
            let _ = tx.send(result);
        });
        self.pending.borrow_mut().insert(id, complete);

        debug!(id, function = name, "outgoing call");
        (self.outbox)(message::call_text(id, name, args.to_params()));
        CallFuture { rx }
    }

    pub fn resolve_incoming(&self, reply: Reply) {
        let Some(complete) = self.pending.borrow_mut().remove(&reply.id) else {
            debug!(id = reply.id, "result for unknown call dropped");
            self.report(Unhandled::UnknownCall { id: reply.id });
            return;
        };

        match &reply.outcome {
            Ok(raw) => complete(Ok(raw.get())),
            Err(raw) => complete(Err(CallError::Rejected(error_message(raw)))),
        }
    }

    pub fn pending_calls(&self) -> usize {
        self.pending.borrow().len()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Reject every pending call with [`CallError::Cancelled`] and drop all
    /// bindings.
    pub fn teardown(&self) {
        let pending: Vec<Pending> = self.pending.borrow_mut().drain().map(|(_, p)| p).collect();
        let functions = std::mem::take(&mut *self.functions.borrow_mut());
        debug!(
            pending = pending.len(),
            functions = functions.len(),
            "bridge torn down"
        );

        for complete in pending {
            complete(Err(CallError::Cancelled));
        }
        drop(functions);
    }

    /// Observe messages that are dropped because nothing handles them.
    pub fn set_unhandled_hook(&self, hook: impl Fn(&Unhandled) + 'static) {
        *self.unhandled.borrow_mut() = Some(Rc::new(hook));
    }

    fn report(&self, unhandled: Unhandled) {
        let hook = self.unhandled.borrow().clone();
        if let Some(hook) = hook {
            hook(&unhandled);
        }
    }
}

/// Page errors are usually strings; anything else is kept as JSON text.
fn error_message(raw: &RawValue) -> String {
    serde_json::from_str::<String>(raw.get()).unwrap_or_else(|_| raw.get().to_string())
}
