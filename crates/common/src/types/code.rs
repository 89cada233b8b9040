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

use std::fmt;

use serde::{Deserialize, Serialize};

/// The emulator's current instruction pointer: a code cell identified by its
/// representation hash plus a bit offset into that cell's data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodePos {
    /// Uppercase hex representation hash of the cell being executed.
    pub cell_hash: String,
    /// Bit offset of the next instruction within the cell.
    pub offset: usize,
}

impl CodePos {
    /// Create a code position, normalizing the hash to uppercase.
    ///
    /// The emulator is not consistent about hash casing across builds, while
    /// the code-cell index keys strictly on the uppercase form.
    pub fn new(cell_hash: impl Into<String>, offset: usize) -> Self {
        let cell_hash: String = cell_hash.into();
        Self { cell_hash: cell_hash.to_uppercase(), offset }
    }
}

impl fmt::Display for CodePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full hashes drown the logs.
        if self.cell_hash.len() > 12 {
            write!(f, "{}...:{}", &self.cell_hash[..12], self.offset)
        } else {
            write!(f, "{}:{}", self.cell_hash, self.offset)
        }
    }
}
