// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;

pub mod console;
pub use self::console::Console;

pub mod memory;
pub use self::memory::Memory;

/// Destination of dispatched records.
pub trait Sink {
    fn submit_metric(&self, metric: metric::Metric) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for &S {
    fn submit_metric(&self, metric: metric::Metric) -> Result<()> {
        (**self).submit_metric(metric)
    }
}

pub mod metric {
    use std::fmt;

    use crate::value::StatValue;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Value {
        Integer(i64),
        Float(f64),
        Text(String),
    }

    impl From<&StatValue> for Value {
        fn from(raw: &StatValue) -> Self {
            if let Ok(v) = raw.as_integer() {
                Value::Integer(v)
            } else if let Ok(v) = raw.as_float() {
                Value::Float(v)
            } else {
                Value::Text(raw.as_str().to_string())
            }
        }
    }

    impl fmt::Display for Value {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Value::Integer(v) => write!(f, "{v}"),
                Value::Float(v) => write!(f, "{v}"),
                Value::Text(v) => write!(f, "{v}"),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Metric {
        pub plugin: String,
        pub plugin_instance: String,
        pub type_name: String,
        pub type_instance: String,
        /// Qualified stat key the record was built from.
        pub key: String,
        pub values: Vec<Value>,
    }
}
