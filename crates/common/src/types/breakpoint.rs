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

/// A source-line breakpoint as reported back to the host.
///
/// Ids are unique across a debug session and allocated monotonically from 0.
/// `verified` is frozen at creation time: it records whether the requested
/// line appeared in the source map when the breakpoint was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Session-unique identifier.
    pub id: u32,
    /// Requested source line (1-based).
    pub line: u32,
    /// Whether the line maps to any reachable statement.
    pub verified: bool,
}

impl Breakpoint {
    /// Create a breakpoint record.
    pub fn new(id: u32, line: u32, verified: bool) -> Self {
        Self { id, line, verified }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} line {}{}", self.id, self.line, if self.verified { "" } else { " (?)" })
    }
}
