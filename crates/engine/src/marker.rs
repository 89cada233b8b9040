// TDB - TVM Debugger
// Copyright (C) 2025 TDB Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Embedded debug-info markers.
//!
//! The toolchain tags instruction boundaries with a DEBUGSTR-style marker:
//!
//! ```text
//! opcode     : 12 bits, value 0xFEF
//! len_minus1 : 4 bits                (1..=16 payload bytes)
//! payload    : (len_minus1 + 1) * 8 bits, UTF-8, "DI" + decimal index
//! ```
//!
//! Markers are a best-effort signal. Anything that fails to decode (short
//! cell, wrong opcode, bad UTF-8, malformed decimal) means "no marker here"
//! and is never an error: the stepping loop simply keeps going.

use eyre::{ensure, Result};
use tdb_common::types::{Cell, CellBuilder};

/// The 12-bit opcode that introduces a debug marker.
pub const MARKER_OPCODE: u64 = 0xFEF;

/// ASCII prefix of the marker payload.
pub const MARKER_PREFIX: &str = "DI";

/// Maximum payload length in bytes (a 4-bit length field stores len - 1).
pub const MAX_PAYLOAD_BYTES: usize = 16;

/// Attempt to decode a marker at `offset` bits into `cell`.
///
/// Returns the embedded DebugInfoIndex, or `None` when the bits at that
/// position are not a well-formed marker.
pub fn decode_marker(cell: &Cell, offset: usize) -> Option<u64> {
    let mut slice = cell.slice();
    slice.skip(offset).ok()?;

    let opcode = slice.load_uint(12).ok()?;
    if opcode != MARKER_OPCODE {
        return None;
    }

    let len = slice.load_uint(4).ok()? as usize + 1;
    let bytes = slice.load_bytes(len).ok()?;
    let payload = std::str::from_utf8(&bytes).ok()?;
    let digits = payload.strip_prefix(MARKER_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok()
}

/// Encode a marker for `index` into `builder`.
///
/// This is the toolchain-facing inverse of [`decode_marker`]; the engine
/// itself only decodes, but test fixtures and the assembler both need the
/// writer side.
pub fn encode_marker(builder: &mut CellBuilder, index: u64) -> Result<()> {
    let payload = format!("{MARKER_PREFIX}{index}");
    ensure!(
        payload.len() <= MAX_PAYLOAD_BYTES,
        "marker payload {payload:?} exceeds {MAX_PAYLOAD_BYTES} bytes"
    );
    builder.store_uint(MARKER_OPCODE, 12)?;
    builder.store_uint((payload.len() - 1) as u64, 4)?;
    builder.store_bytes(payload.as_bytes())?;
    Ok(())
}

/// Bit width of an encoded marker for `index`.
pub fn marker_bit_len(index: u64) -> usize {
    12 + 4 + (MARKER_PREFIX.len() + index.to_string().len()) * 8
}
