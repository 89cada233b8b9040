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

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// A source-level activation record.
///
/// Frames copy the name, path, and line they need from the source map, so
/// the frame stack owns its data outright and carries no back references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Name of the source function this frame executes.
    pub function: String,
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// Current line within the frame (1-based). Updated on every statement.
    pub line: u32,
}

impl StackFrame {
    /// Create a frame positioned at its entry line.
    pub fn new(function: impl Into<String>, path: impl Into<PathBuf>, line: u32) -> Self {
        Self { function: function.into(), path: path.into(), line }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.function, self.path.display(), self.line)
    }
}
