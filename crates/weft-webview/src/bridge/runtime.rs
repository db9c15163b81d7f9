//! Page-side half of the bridge, injected before any page script runs.

use tracing::warn;
use weft_common::is_valid_js_identifier;

pub const DEFAULT_GLOBAL: &str = "weft";

const RUNTIME: &str = r#"(function () {
  if (window.__GLOBAL__ && window.__GLOBAL__.__bridge) return;

  var pending = new Map();
  var exposed = new Map();
  var nextId = 1;

  function send(message) {
    window.ipc.postMessage(JSON.stringify(message));
  }

  function describe(error) {
    if (error === undefined || error === null) return null;
    if (error instanceof Error) return error.message;
    if (typeof error === "function" || typeof error === "symbol") return String(error);
    return error;
  }

  function reply(id, outcome) {
    Promise.resolve()
      .then(outcome)
      .then(
        function (result) { send({ id: id, result: result === undefined ? null : result }); },
        function (error) { send({ id: id, error: describe(error) }); }
      );
  }

  window.__GLOBAL__ = {
    __bridge: true,

    call: function (name) {
      var params = Array.prototype.slice.call(arguments, 1);
      var id = nextId++;
      return new Promise(function (resolve, reject) {
        pending.set(id, { resolve: resolve, reject: reject });
        send({ id: id, name: name, params: params });
      });
    },

    expose: function (name, fn) {
      exposed.set(name, fn);
    },

    unexpose: function (name) {
      exposed.delete(name);
    },

    startDrag: function () {
      send({ drag: true });
    },

    startResize: function (edge) {
      send({ resize: edge });
    },

    _receive: function (message) {
      if (typeof message === "string") message = JSON.parse(message);

      if ("name" in message) {
        var fn = exposed.get(message.name);
        if (!fn) return;
        reply(message.id, function () { return fn.apply(null, message.params); });
        return;
      }

      var entry = pending.get(message.id);
      if (!entry) return;
      pending.delete(message.id);

      if ("error" in message) entry.reject(message.error);
      else entry.resolve(message.result);
    }
  };
})();
"#;

/// The runtime script with its page global set to `global`.
///
/// Falls back to [`DEFAULT_GLOBAL`] if `global` is not a plain identifier.
pub fn runtime_script(global: &str) -> String {
    let global = if is_valid_js_identifier(global) {
        global
    } else {
        warn!(global, "invalid bridge global, using default");
        DEFAULT_GLOBAL
    };
    RUNTIME.replace("__GLOBAL__", global)
}

/// JavaScript that hands `message` to the runtime's receiver.
pub fn receive_call(global: &str, message: &str) -> String {
    format!("window.{global} && window.{global}._receive({message});")
}
