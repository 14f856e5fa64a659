// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! `stats` over the memcached binary protocol.
//!
//! The request is a single STAT packet whose key is the subcommand. The
//! server answers with one packet per stat and closes the run with a packet
//! that has an empty key. Each packet already carries a key and a value, so
//! no line parsing happens here.

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::errors::FetchError;
use crate::protocol::{Endpoint, Subcommand};
use crate::stats::StatBlock;

pub(crate) const HEADER_LEN: usize = 24;
pub(crate) const REQUEST_MAGIC: u8 = 0x80;
pub(crate) const RESPONSE_MAGIC: u8 = 0x81;
pub(crate) const OPCODE_STAT: u8 = 0x10;
pub(crate) const STATUS_OK: u16 = 0x0000;
pub(crate) const STATUS_UNKNOWN_COMMAND: u16 = 0x0081;

// Largest packet body accepted from a server. Stats packets are tiny.
const MAX_BODY_LEN: u32 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub magic: u8,
    pub opcode: u8,
    pub key_len: u16,
    pub extras_len: u8,
    /// vbucket id in requests, status in responses
    pub status: u16,
    pub body_len: u32,
    pub opaque: u32,
}

impl Header {
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        buf.push(self.magic);
        buf.push(self.opcode);
        buf.extend_from_slice(&self.key_len.to_be_bytes());
        buf.push(self.extras_len);
        buf.push(0); // data type
        buf.extend_from_slice(&self.status.to_be_bytes());
        buf.extend_from_slice(&self.body_len.to_be_bytes());
        buf.extend_from_slice(&self.opaque.to_be_bytes());
        buf.extend_from_slice(&[0u8; 8]); // cas
        buf
    }

    pub(crate) fn decode(buf: [u8; HEADER_LEN]) -> Self {
        let [
            magic,
            opcode,
            k0,
            k1,
            extras_len,
            _data_type,
            s0,
            s1,
            b0,
            b1,
            b2,
            b3,
            o0,
            o1,
            o2,
            o3,
            ..,
        ] = buf;
        Self {
            magic,
            opcode,
            key_len: u16::from_be_bytes([k0, k1]),
            extras_len,
            status: u16::from_be_bytes([s0, s1]),
            body_len: u32::from_be_bytes([b0, b1, b2, b3]),
            opaque: u32::from_be_bytes([o0, o1, o2, o3]),
        }
    }
}

/// Encode the STAT request packet for `subcommand`.
pub fn request(subcommand: Subcommand) -> Vec<u8> {
    let key = subcommand.as_str().as_bytes();
    // Subcommand names are a handful of bytes.
    let key_len = key.len() as u16;
    let mut packet = Header {
        magic: REQUEST_MAGIC,
        opcode: OPCODE_STAT,
        key_len,
        extras_len: 0,
        status: 0,
        body_len: u32::from(key_len),
        opaque: 0,
    }
    .encode();
    packet.extend_from_slice(key);
    packet
}

pub(crate) async fn fetch(
    mut stream: TcpStream,
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

    stream
        .write_all(&request(subcommand))
        .await
        .map_err(io_err)?;

    let mut block = StatBlock::new();
    loop {
        let mut raw = [0u8; HEADER_LEN];
        if let Err(e) = stream.read_exact(&mut raw).await {
            return Err(match e.kind() {
                std::io::ErrorKind::UnexpectedEof => FetchError::UnexpectedEof {
                    endpoint: endpoint.clone(),
                    subcommand,
                },
                _ => io_err(e),
            });
        }
        let header = Header::decode(raw);

        if header.magic != RESPONSE_MAGIC {
            return Err(protocol_err(format!(
                "bad magic byte {:#04x}",
                header.magic
            )));
        }
        if header.opcode != OPCODE_STAT {
            return Err(protocol_err(format!(
                "unexpected opcode {:#04x}",
                header.opcode
            )));
        }
        if header.body_len > MAX_BODY_LEN {
            return Err(protocol_err(format!(
                "body of {} bytes exceeds the {MAX_BODY_LEN} byte limit",
                header.body_len
            )));
        }

        let mut body = vec![0u8; header.body_len as usize];
        stream.read_exact(&mut body).await.map_err(io_err)?;

        let key_start = usize::from(header.extras_len);
        let key_end = key_start + usize::from(header.key_len);
        let (Some(key), Some(value)) = (body.get(key_start..key_end), body.get(key_end..)) else {
            return Err(protocol_err(format!(
                "key and extras ({key_end} bytes) overrun a {} byte body",
                body.len()
            )));
        };

        if header.status != STATUS_OK {
            return Err(FetchError::Server {
                endpoint: endpoint.clone(),
                subcommand,
                message: format!(
                    "status {:#06x}: {}",
                    header.status,
                    String::from_utf8_lossy(value)
                ),
            });
        }
        if key.is_empty() {
            break;
        }
        block.push(
            String::from_utf8_lossy(key).into_owned(),
            String::from_utf8_lossy(value).into_owned(),
        );
    }

    debug!(
        "read {} stat(s) for `stats {subcommand}` from {endpoint} (binary)",
        block.len()
    );
    Ok(block)
}

/// Encode one STAT response packet, as a server would send it.
#[cfg(test)]
pub(crate) fn response(status: u16, key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut packet = Header {
        magic: RESPONSE_MAGIC,
        opcode: OPCODE_STAT,
        key_len: key.len() as u16,
        extras_len: 0,
        status,
        body_len: (key.len() + value.len()) as u32,
        opaque: 0,
    }
    .encode();
    packet.extend_from_slice(key);
    packet.extend_from_slice(value);
    packet
}
