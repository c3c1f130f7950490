//! Sample records shared by the unit tests

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tagscope_core::{Complex, Value};

tagscope_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Sample {
        pub bool_val: bool => r#"api:"boolVal,omitempty" inherit:"dynamic" testtag:"boolVal" inheritbool:"or""#,
        pub bool_pointer_val: Option<bool> => r#"api:"boolPointerVal" inherit:"dynamic""#,
        pub complex_val: Complex => r#"inherit:"dynamic""#,
        pub float_val: f64 => r#"api:"floatVal" inherit:"dynamic""#,
        pub int_val: i64 => r#"api:"intVal""#,
        pub interface_val: Value => r#"api:"interfaceVal""#,
        pub string_val: String => r#"api:"stringVal" inherit:"dynamic" testtag:"stringVal""#,
        pub substruct_val: SampleSub => r#"api:",inline" inherit:"dynamic""#,
        pub time_val: DateTime<Utc> => r#"api:"timeVal,omitempty" inherit:"dynamic""#,
        pub time_pointer_val: Option<DateTime<Utc>> => r#"api:"timePointerVal" inherit:"dynamic""#,
        pub uint_val: u64 => r#"api:"uintVal" testtag:"uintVal""#,
    }
}

tagscope_core::record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct SampleSub {
        pub func_cal: fn(),
        pub map_val: HashMap<String, String> => r#"api:"mapVal" inherit:"dynamic""#,
        pub slice_val: Vec<i64> => r#"api:"sliceVal""#,
    }
}

fn noop() {}

impl Default for SampleSub {
    fn default() -> Self {
        Self {
            func_cal: noop,
            map_val: HashMap::new(),
            slice_val: Vec::new(),
        }
    }
}
