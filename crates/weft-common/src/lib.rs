pub mod errors;
pub mod id;
pub mod names;

pub use errors::{ConfigError, WeftError};
pub use id::{new_id, IdSequence, InstanceId};
pub use names::{is_valid_js_identifier, is_valid_scheme_name};

pub type Result<T> = std::result::Result<T, WeftError>;
