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

//! Source map built from the compiler's debug-info table.
//!
//! Each entry of the toolchain's `locations` array becomes one
//! [`SourceMapEntry`], keyed by its position, which is exactly the
//! DebugInfoIndex the bytecode markers embed. The map also carries the
//! derived available-lines index (the set of `(path, line)` pairs any entry
//! mentions) and the ordered global names. All of it is immutable after
//! load; queries never recompute.

use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tdb_common::types::DebugInfo;
use tracing::debug;

/// A resolved source position: absolute path, 1-based line, enclosing
/// function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// Source line (1-based).
    pub line: u32,
    /// Name of the enclosing function.
    pub function: String,
}

/// One classified debug-info entry.
///
/// A closed sum: the stepping loop dispatches on it exhaustively and there
/// is no fourth kind of marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceMapEntry {
    /// An executable statement.
    Statement {
        /// Where the statement lives.
        location: SourceLocation,
        /// Local names, ordered to match operand-stack positions.
        variables: Vec<String>,
        /// True on the first statement of a function body.
        first_statement: bool,
    },
    /// A function return point.
    Return {
        /// Where the return lives.
        location: SourceLocation,
    },
    /// A catch-handler entry.
    Catch {
        /// Where the handler lives.
        location: SourceLocation,
    },
}

impl SourceMapEntry {
    /// The source location of any entry kind.
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::Statement { location, .. } | Self::Return { location } | Self::Catch { location } => {
                location
            }
        }
    }
}

/// The DebugInfoIndex → entry mapping plus its derived indexes.
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    entries: Vec<SourceMapEntry>,
    available: HashMap<PathBuf, BTreeSet<u32>>,
    globals: Vec<String>,
}

impl SourceMap {
    /// Build the map from the toolchain's debug info.
    ///
    /// Relative `file` paths are resolved against `source_root` lexically;
    /// the debuggee's sources need not exist on the machine running the
    /// engine.
    pub fn from_debug_info(info: &DebugInfo, source_root: &Path) -> Self {
        let mut entries = Vec::with_capacity(info.locations.len());
        let mut available: HashMap<PathBuf, BTreeSet<u32>> = HashMap::new();

        for loc in &info.locations {
            let location = SourceLocation {
                path: resolve_path(&loc.file, source_root),
                line: loc.line,
                function: loc.func.clone(),
            };
            available.entry(location.path.clone()).or_default().insert(location.line);

            let entry = if loc.ret {
                SourceMapEntry::Return { location }
            } else if loc.is_catch {
                SourceMapEntry::Catch { location }
            } else {
                SourceMapEntry::Statement {
                    location,
                    variables: loc.vars.clone().unwrap_or_default(),
                    first_statement: loc.first_stmt,
                }
            };
            entries.push(entry);
        }

        let globals = info.globals.iter().map(|g| g.name.clone()).collect();
        debug!(entries = entries.len(), files = available.len(), "Loaded source map");
        Self { entries, available, globals }
    }

    /// The entry at a DebugInfoIndex, if the index is in range.
    pub fn entry(&self, index: u64) -> Option<&SourceMapEntry> {
        self.entries.get(usize::try_from(index).ok()?)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All source paths any entry mentions, sorted.
    pub fn available_paths(&self) -> Vec<&Path> {
        self.available.keys().map(PathBuf::as_path).sorted().collect()
    }

    /// The lines of `path` that any entry mentions, ascending. Empty for an
    /// unknown path.
    pub fn available_lines(&self, path: &Path) -> Vec<u32> {
        self.available.get(path).map(|lines| lines.iter().copied().collect()).unwrap_or_default()
    }

    /// Whether `(path, line)` appears in any entry. O(log n) on the per-path
    /// line set.
    pub fn is_line_available(&self, path: &Path, line: u32) -> bool {
        self.available.get(path).is_some_and(|lines| lines.contains(&line))
    }

    /// Ordered global-variable names.
    pub fn globals(&self) -> &[String] {
        &self.globals
    }
}

fn resolve_path(file: &str, source_root: &Path) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        source_root.join(path)
    }
}
