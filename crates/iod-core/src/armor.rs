//! Minimal PEM payload extraction.
//!
//! PEM is base64 between a `-----BEGIN ...-----` line and an `-----END ...-----`
//! line. Only the first marker pair is considered; anything outside it is
//! ignored. Labels are not checked here, callers interpret the DER themselves.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

const BEGIN_MARKER: &str = "-----BEGIN";
const END_MARKER: &str = "-----END";

#[derive(Error, Debug)]
pub enum PemError {
    #[error("no BEGIN marker found")]
    MissingBegin,

    #[error("no END marker after the BEGIN marker")]
    MissingEnd,

    #[error("PEM payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Extract and decode the payload of the first PEM block in `text`.
///
/// Line breaks (and other ASCII whitespace) inside the payload are ignored,
/// so wrapped and single-line encodings decode to the same bytes. An empty
/// payload decodes to an empty vector.
pub fn read_pem(text: &str) -> Result<Vec<u8>, PemError> {
    let begin = find_at_line_start(text, BEGIN_MARKER, 0).ok_or(PemError::MissingBegin)?;

    // The payload starts on the line after the BEGIN marker.
    let payload_start = text[begin..]
        .find('\n')
        .map(|i| begin + i + 1)
        .ok_or(PemError::MissingEnd)?;

    let end = find_at_line_start(text, END_MARKER, payload_start).ok_or(PemError::MissingEnd)?;

    let payload: String = text[payload_start..end]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    Ok(STANDARD.decode(payload)?)
}

/// Wrap an already base64-encoded payload as a single-line PEM block.
pub fn wrap_pem(label: &str, base64_payload: &str) -> String {
    format!("-----BEGIN {label}-----\n{base64_payload}\n-----END {label}-----\n")
}

/// First occurrence of `marker` at or after `from` that begins a line.
fn find_at_line_start(text: &str, marker: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    text[from..]
        .match_indices(marker)
        .map(|(i, _)| from + i)
        .find(|&i| i == from || bytes[i - 1] == b'\n')
}
