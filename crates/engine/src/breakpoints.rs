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

//! Per-path breakpoint storage.
//!
//! DAP hosts replace breakpoints wholesale per file (clear then set), so the
//! store keeps one insertion-ordered list per path and never merges
//! duplicates. Ids are unique across the whole session and verification is
//! decided by the caller at set time, then frozen.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tdb_common::types::Breakpoint;
use tracing::debug;

/// Breakpoints grouped by source path, with a session-wide id counter.
#[derive(Debug, Default, Clone)]
pub struct BreakpointStore {
    by_path: HashMap<PathBuf, Vec<Breakpoint>>,
    next_id: u32,
}

impl BreakpointStore {
    /// Create an empty store. Ids start at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every breakpoint of `path`. Other paths are untouched.
    pub fn clear(&mut self, path: &Path) {
        if let Some(removed) = self.by_path.remove(path) {
            debug!(path = %path.display(), count = removed.len(), "Cleared breakpoints");
        }
    }

    /// Add a breakpoint on `path` at `line` and return the new record.
    ///
    /// Duplicates are permitted; each call allocates a fresh id.
    pub fn set(&mut self, path: &Path, line: u32, verified: bool) -> Breakpoint {
        let bp = Breakpoint::new(self.next_id, line, verified);
        self.next_id += 1;
        self.by_path.entry(path.to_path_buf()).or_default().push(bp);
        debug!(path = %path.display(), %bp, "Set breakpoint");
        bp
    }

    /// Whether `path` has a breakpoint on `line`.
    ///
    /// Per-path lists stay small, so a linear scan is fine.
    pub fn has_breakpoint(&self, path: &Path, line: u32) -> bool {
        self.by_path.get(path).is_some_and(|list| list.iter().any(|bp| bp.line == line))
    }

    /// The breakpoints of `path` in insertion order.
    pub fn breakpoints(&self, path: &Path) -> &[Breakpoint] {
        self.by_path.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    /// Total number of breakpoints across all paths.
    pub fn len(&self) -> usize {
        self.by_path.values().map(Vec::len).sum()
    }

    /// True when no breakpoints are set anywhere.
    pub fn is_empty(&self) -> bool {
        self.by_path.values().all(Vec::is_empty)
    }
}
