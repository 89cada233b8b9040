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

//! Items of the TVM operand stack and the C7 context register.

use std::fmt;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// A value observed on the VM operand stack or inside the C7 tuple.
///
/// Integers are kept as decimal strings: TVM integers are 257-bit and the
/// engine only ever displays them, never computes with them. Cell-like
/// values are identified by their representation hash; dereferencing them
/// is the host's business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, From)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TvmValue {
    /// The TVM null value.
    Null,
    /// An integer, rendered in decimal.
    Int {
        /// Decimal rendering, possibly wider than any machine integer.
        value: String,
    },
    /// A cell reference.
    Cell {
        /// Uppercase hex representation hash.
        hash: String,
    },
    /// A cell slice.
    Slice {
        /// Uppercase hex representation hash of the underlying cell.
        hash: String,
    },
    /// A partially built cell.
    Builder {
        /// Uppercase hex representation hash of the builder contents.
        hash: String,
    },
    /// A continuation.
    Continuation {
        /// Uppercase hex representation hash of the continuation body.
        hash: String,
    },
    /// A tuple of values.
    #[from]
    Tuple {
        /// Tuple elements in order.
        items: Vec<TvmValue>,
    },
    /// Anything the emulator reported that the engine does not model.
    Unknown {
        /// The emulator's own rendering of the value.
        repr: String,
    },
}

impl TvmValue {
    /// Integer value from anything displayable as decimal.
    pub fn int(value: impl fmt::Display) -> Self {
        Self::Int { value: value.to_string() }
    }

    /// Tuple value from its elements.
    pub fn tuple(items: Vec<TvmValue>) -> Self {
        Self::Tuple { items }
    }

    /// True for the TVM null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for TvmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int { value } => write!(f, "{value}"),
            Self::Cell { hash } => write!(f, "cell{{{hash}}}"),
            Self::Slice { hash } => write!(f, "slice{{{hash}}}"),
            Self::Builder { hash } => write!(f, "builder{{{hash}}}"),
            Self::Continuation { hash } => write!(f, "cont{{{hash}}}"),
            Self::Tuple { items } => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Unknown { repr } => write!(f, "{repr}"),
        }
    }
}
