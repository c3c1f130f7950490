pub use tagscope_core;

pub mod accessors;
pub mod coerce;
pub mod diff;
pub mod env;
pub mod inject;
pub mod merge;
pub mod query;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use accessors::{
    field_names_of, get_api_field_names, get_field_names, get_field_value, get_tag_field_names,
    value_at,
};
pub use coerce::{parse_datetime, parse_typed_value};
pub use diff::{calculate_diff, calculate_diff_values, calculate_diff_with_tag, DiffResult};
pub use env::{set_env_field_values, set_env_field_values_value, set_env_field_values_with};
pub use inject::inject_variables;
pub use merge::{
    inherit, inherit_value, inherit_with_tag, merge_value, overwrite, overwrite_value,
    overwrite_with_tag, BoolStrategy, MergeMode,
};
pub use query::{
    format_query_time, set_query_fields, set_query_fields_value, set_query_fields_with_tag,
};
pub use retry::{incremental_backoff, retry_n, retry_unlimited, sleep_incremental, Attempt};

// Re-export core types for convenience
pub use tagscope_core::{Record, RecordValue, Reflect, Result, TagscopeError, Value};
