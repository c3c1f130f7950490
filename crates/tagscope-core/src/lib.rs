//! # Tagscope Core
//!
//! Dynamic value model and tag-driven field walking for tagscope.
//!
//! ## Model
//! - [`Value`] is the closed set of runtime kinds every engine dispatches on
//! - [`Reflect`] moves concrete Rust types in and out of that model
//! - [`Record`] exposes a struct as an ordered, tagged [`RecordValue`]
//!
//! Records are usually declared with the [`record!`] macro, which generates
//! both trait impls from the struct definition and its per-field tag strings.

pub mod error;
pub mod record;
pub mod reflect;
pub mod tags;
pub mod value;
pub mod walker;

pub use error::{Result, TagscopeError};
pub use record::{Field, RecordValue};
pub use reflect::{FromValue, Record, Reflect};
pub use tags::{get_tag_value, TagValue, Tags};
pub use value::{format_float, sprint, Complex, FieldKind, Value};
pub use walker::{resolve_record, walk, walk_record, FieldDescriptor};

/// Current tagscope version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build information for diagnostics
pub const BUILD_INFO: &str = concat!(
    "Tagscope ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Standard tag namespaces
pub mod namespaces {
    /// External names used by diff and query flattening.
    pub const API: &str = "api";
    /// Environment variable bindings.
    pub const ENV: &str = "env";
    /// Appended to a merge namespace to name its boolean strategy tag.
    pub const BOOL_SUFFIX: &str = "bool";
}
