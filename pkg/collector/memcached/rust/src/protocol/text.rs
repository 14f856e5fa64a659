// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::errors::FetchError;
use crate::parser;
use crate::protocol::{Endpoint, Subcommand};
use crate::stats::StatBlock;

/// Request line for `subcommand`, newline included.
pub fn request(subcommand: Subcommand) -> String {
    match subcommand {
        Subcommand::General => "stats\n".to_string(),
        other => format!("stats {other}\n"),
    }
}

// Bounds on a reply. Real stats lines are well under 100 bytes and a
// server with every slab class in use sends a few thousand of them.
const MAX_LINE_LEN: usize = 8 * 1024;
const MAX_LINES: usize = 64 * 1024;

/// Send one `stats` request and read the reply up to its terminator.
pub(crate) async fn fetch(
    stream: TcpStream,
    endpoint: &Endpoint,
    subcommand: Subcommand,
) -> Result<StatBlock, FetchError> {
    let io_err = |source| FetchError::Io {
        endpoint: endpoint.clone(),
        source,
    };
    let protocol_err = |context: String| FetchError::Protocol {
        endpoint: endpoint.clone(),
        context,
    };

    let mut stream = BufReader::new(stream);
    stream
        .get_mut()
        .write_all(request(subcommand).as_bytes())
        .await
        .map_err(io_err)?;

    let mut lines = Vec::new();
    let mut skipped = 0usize;
    loop {
        if lines.len() + skipped >= MAX_LINES {
            return Err(protocol_err(format!(
                "`stats {subcommand}` sent more than {MAX_LINES} lines"
            )));
        }

        let mut raw = Vec::new();
        let read = (&mut stream)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_until(b'\n', &mut raw)
            .await
            .map_err(io_err)?;
        if read == 0 {
            return Err(FetchError::UnexpectedEof {
                endpoint: endpoint.clone(),
                subcommand,
            });
        }
        if raw.len() > MAX_LINE_LEN {
            return Err(protocol_err(format!(
                "line longer than {MAX_LINE_LEN} bytes in `stats {subcommand}`"
            )));
        }

        let line = match parser::decode_line(raw) {
            Ok(line) => line,
            Err(e) => {
                debug!("skipping stats line: {e}");
                skipped += 1;
                continue;
            }
        };
        if parser::is_terminator(&line) {
            break;
        }
        if let Some(message) = parser::error_reply(&line) {
            return Err(FetchError::Server {
                endpoint: endpoint.clone(),
                subcommand,
                message: message.to_string(),
            });
        }
        lines.push(line);
    }

    debug!(
        "read {} line(s) for `stats {subcommand}` from {endpoint}",
        lines.len()
    );
    Ok(parser::parse_lines(lines))
}
