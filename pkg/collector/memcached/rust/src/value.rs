// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

use crate::errors::ValueError;

/// A stat value exactly as the server reported it.
///
/// Servers mix integers, floats (`rusage_user 0.123456`) and plain strings
/// (`version 1.6.21`) in the same block, so values stay text until a
/// consumer asks for a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatValue(String);

impl StatValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_integer(&self) -> Result<i64, ValueError> {
        self.0
            .trim()
            .parse::<i64>()
            .map_err(|_| ValueError::NotInteger {
                value: self.0.clone(),
            })
    }

    pub fn as_float(&self) -> Result<f64, ValueError> {
        match self.0.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(ValueError::NotFloat {
                value: self.0.clone(),
            }),
        }
    }
}

impl From<&str> for StatValue {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for StatValue {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
