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

//! Content-addressed code cells.
//!
//! TVM code lives in a DAG of bit-strings with up to four child references.
//! Every cell is identified by the SHA-256 hash of its representation, so the
//! graph is acyclic by construction and cells can be indexed by hash alone.
//! [`CellBuilder`] writes bits most-significant first; [`CellSlice`] reads
//! them back from an arbitrary bit offset, which is exactly what the marker
//! decoder needs when the emulator reports a code position mid-cell.

use std::{fmt, sync::Arc};

use eyre::{bail, ensure, Result};
use sha2::{Digest, Sha256};

/// Maximum number of data bits a single cell can hold.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of child references a single cell can hold.
pub const MAX_CELL_REFS: usize = 4;

/// Representation hash of a cell (SHA-256).
pub type CellHash = [u8; 32];

/// An immutable node in the code DAG.
///
/// The data buffer always has `ceil(bit_len / 8)` bytes and unused trailing
/// bits are zero, so two cells with equal bit content have equal buffers.
#[derive(Clone)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    hash: CellHash,
}

impl Cell {
    /// Number of data bits stored in this cell.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Raw data bytes. Trailing bits beyond `bit_len` are zero.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Child cells, in reference order.
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Representation hash of this cell.
    pub fn hash(&self) -> &CellHash {
        &self.hash
    }

    /// Uppercase hex rendering of the representation hash.
    ///
    /// This is the form the emulator reports in code positions and the key
    /// the code-cell index is built on.
    pub fn hash_hex(&self) -> String {
        hex::encode_upper(self.hash)
    }

    /// Open a bit-level reader positioned at the start of the cell.
    pub fn slice(&self) -> CellSlice<'_> {
        CellSlice { cell: self, pos: 0 }
    }

    /// Representation hash: descriptors, completion-tagged data, child hashes.
    fn compute_hash(data: &[u8], bit_len: usize, refs: &[Arc<Cell>]) -> CellHash {
        let mut hasher = Sha256::new();
        let d1 = refs.len() as u8;
        let d2 = (bit_len / 8 + bit_len.div_ceil(8)) as u8;
        hasher.update([d1, d2]);
        if bit_len % 8 == 0 {
            hasher.update(data);
        } else {
            // Completion tag: a single one-bit after the data marks its end,
            // so cells differing only in bit length hash differently.
            let mut augmented = data.to_vec();
            let last = augmented.last_mut().expect("partial byte implies data");
            *last |= 0x80 >> (bit_len % 8);
            hasher.update(&augmented);
        }
        for child in refs {
            hasher.update(child.hash());
        }
        hasher.finalize().into()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("hash", &self.hash_hex())
            .field("bit_len", &self.bit_len)
            .field("refs", &self.refs.len())
            .finish()
    }
}

/// Bit-level writer producing a [`Cell`].
///
/// Bits are stored most-significant first, matching the order the TVM
/// assembler lays out instruction encodings.
#[derive(Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Append a single bit.
    pub fn store_bit(&mut self, bit: bool) -> Result<()> {
        ensure!(self.bit_len < MAX_CELL_BITS, "cell capacity exceeded: {MAX_CELL_BITS} bits");
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len / 8;
            self.data[idx] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(())
    }

    /// Append the low `bits` bits of `value`, most-significant first.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<()> {
        ensure!(bits <= 64, "cannot store more than 64 bits at once, got {bits}");
        if bits < 64 && value >> bits != 0 {
            bail!("value {value} does not fit into {bits} bits");
        }
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(())
    }

    /// Append whole bytes.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for byte in bytes {
            self.store_uint(u64::from(*byte), 8)?;
        }
        Ok(())
    }

    /// Append a child reference.
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<()> {
        ensure!(self.refs.len() < MAX_CELL_REFS, "cell reference limit exceeded: {MAX_CELL_REFS}");
        self.refs.push(cell);
        Ok(())
    }

    /// Finish the cell and compute its representation hash.
    pub fn build(self) -> Cell {
        let hash = Cell::compute_hash(&self.data, self.bit_len, &self.refs);
        Cell { data: self.data, bit_len: self.bit_len, refs: self.refs, hash }
    }
}

/// Bit-level reader over a cell's data, seekable to any offset.
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    pos: usize,
}

impl CellSlice<'_> {
    /// Number of unread bits.
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len.saturating_sub(self.pos)
    }

    /// Advance the cursor by `bits` without reading.
    pub fn skip(&mut self, bits: usize) -> Result<()> {
        ensure!(
            bits <= self.remaining_bits(),
            "cannot skip {bits} bits, only {} remain",
            self.remaining_bits()
        );
        self.pos += bits;
        Ok(())
    }

    /// Read a single bit.
    pub fn load_bit(&mut self) -> Result<bool> {
        ensure!(self.remaining_bits() >= 1, "cell data exhausted");
        let bit = self.cell.data[self.pos / 8] & (0x80 >> (self.pos % 8)) != 0;
        self.pos += 1;
        Ok(bit)
    }

    /// Read `bits` bits as an unsigned integer, most-significant first.
    pub fn load_uint(&mut self, bits: usize) -> Result<u64> {
        ensure!(bits <= 64, "cannot load more than 64 bits at once, got {bits}");
        ensure!(
            bits <= self.remaining_bits(),
            "cannot load {bits} bits, only {} remain",
            self.remaining_bits()
        );
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | u64::from(self.load_bit()?);
        }
        Ok(value)
    }

    /// Read `len` whole bytes.
    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.load_uint(8)? as u8);
        }
        Ok(out)
    }
}
