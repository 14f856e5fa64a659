// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Parsing of the text protocol's `stats` replies.
//!
//! A reply is a run of `STAT <key> <value>` lines closed by `END`. Malformed
//! lines are logged and skipped; they never invalidate the rest of the block.

use log::debug;

use crate::errors::ParseError;
use crate::stats::StatBlock;

pub const TERMINATOR: &str = "END";
const STAT_TAG: &str = "STAT";
const ERROR_REPLIES: [&str; 3] = ["ERROR", "CLIENT_ERROR", "SERVER_ERROR"];

/// Parse the lines of one reply into a block, stopping at the terminator.
pub fn parse_lines<I, S>(lines: I) -> StatBlock
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut block = StatBlock::new();
    for line in lines {
        let line = trim_eol(line.as_ref());
        if is_terminator(line) {
            break;
        }
        match parse_line(line) {
            Ok((key, value)) => block.push(key, value),
            Err(e) => debug!("skipping stats line: {e}"),
        }
    }
    block
}

/// Split a single `STAT <key> <value>` line into its key and value.
///
/// The value is everything after the key, so values containing spaces are
/// kept whole.
pub fn parse_line(line: &str) -> Result<(&str, &str), ParseError> {
    let line = trim_eol(line);
    let mut parts = line.splitn(3, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(STAT_TAG), Some(key), Some(value)) if !key.is_empty() && !value.trim().is_empty() => {
            Ok((key, value.trim()))
        }
        (Some(STAT_TAG), None, _) | (Some(STAT_TAG), Some(""), _) => Err(ParseError::MissingKey {
            line: line.to_string(),
        }),
        (Some(STAT_TAG), Some(_), _) => Err(ParseError::MissingValue {
            line: line.to_string(),
        }),
        _ => Err(ParseError::UnexpectedLine {
            line: line.to_string(),
        }),
    }
}

/// Decode one raw reply line. Servers echo keys byte for byte, so a line is
/// not guaranteed to be UTF-8.
pub fn decode_line(raw: Vec<u8>) -> Result<String, ParseError> {
    String::from_utf8(raw).map_err(|e| ParseError::NotUtf8 {
        line: String::from_utf8_lossy(e.as_bytes()).trim_end().to_string(),
    })
}

pub fn is_terminator(line: &str) -> bool {
    trim_eol(line) == TERMINATOR
}

/// If `line` is one of the server's error replies, return its message.
pub fn error_reply(line: &str) -> Option<&str> {
    let line = trim_eol(line);
    ERROR_REPLIES.iter().find_map(|tag| {
        let rest = line.strip_prefix(tag)?;
        if rest.is_empty() {
            Some(*tag)
        } else {
            rest.strip_prefix(' ').map(str::trim)
        }
    })
}

fn trim_eol(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
