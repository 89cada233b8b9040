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

//! The debug-info table emitted by the FunC toolchain.
//!
//! Field names are fixed by the compiler's JSON output and must not be
//! renamed. The `locations` array is indexed by the DebugInfoIndex embedded
//! in the bytecode markers.

use serde::{Deserialize, Serialize};

/// The complete debug-info table for one compiled contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// Source locations, indexed by DebugInfoIndex.
    pub locations: Vec<DebugInfoLocation>,
    /// Ordered global-variable names (positional in the C7 tuple).
    #[serde(default)]
    pub globals: Vec<GlobalEntry>,
}

impl DebugInfo {
    /// Parse the table from the toolchain's JSON output.
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One entry of the `locations` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfoLocation {
    /// Source file path, possibly relative to the compilation root.
    pub file: String,
    /// Source line (1-based).
    pub line: u32,
    /// Name of the enclosing function.
    pub func: String,
    /// Marks a return point.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ret: bool,
    /// Marks a catch-handler entry.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_catch: bool,
    /// Local-variable names, ordered to match operand-stack positions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<Vec<String>>,
    /// Marks the first statement of a function body.
    #[serde(default, skip_serializing_if = "is_false")]
    pub first_stmt: bool,
}

/// One entry of the `globals` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalEntry {
    /// Global-variable name.
    pub name: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}
