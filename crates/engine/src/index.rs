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

//! Code-cell index.
//!
//! Built once at session preparation by walking the code DAG from the root.
//! Stepping then resolves every reported code position through this index;
//! a hash the emulator reports that is not in here (library code, system
//! continuations) simply yields no marker.

use std::{collections::HashMap, sync::Arc};

use tdb_common::types::Cell;
use tracing::debug;

/// Hash-keyed map of every cell reachable from the code root.
///
/// Keys are uppercase hex representation hashes. Content addressing makes
/// cycles impossible, so a plain worklist with a visited set covers the
/// whole graph.
#[derive(Debug, Default, Clone)]
pub struct CodeCellIndex {
    cells: HashMap<String, Arc<Cell>>,
}

impl CodeCellIndex {
    /// Build the index by traversing the DAG from `root`.
    pub fn build(root: Arc<Cell>) -> Self {
        let mut cells = HashMap::new();
        let mut worklist = vec![root];

        while let Some(cell) = worklist.pop() {
            let key = cell.hash_hex();
            if cells.contains_key(&key) {
                continue;
            }
            worklist.extend(cell.refs().iter().cloned());
            cells.insert(key, cell);
        }

        debug!(cells = cells.len(), "Indexed code cells");
        Self { cells }
    }

    /// Look up a cell by hash. Accepts any hex casing.
    pub fn get(&self, hash: &str) -> Option<&Arc<Cell>> {
        if hash.bytes().any(|b| b.is_ascii_lowercase()) {
            self.cells.get(&hash.to_uppercase())
        } else {
            self.cells.get(hash)
        }
    }

    /// Number of distinct cells indexed.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the index holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdb_common::types::CellBuilder;

    fn leaf(tag: u64) -> Arc<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_uint(tag, 16).unwrap();
        Arc::new(builder.build())
    }

    #[test]
    fn test_build_covers_all_reachable_cells() {
        let a = leaf(1);
        let b = leaf(2);
        let mut mid = CellBuilder::new();
        mid.store_ref(Arc::clone(&a)).unwrap();
        mid.store_ref(Arc::clone(&b)).unwrap();
        let mid = Arc::new(mid.build());
        let mut root = CellBuilder::new();
        root.store_uint(9, 8).unwrap();
        root.store_ref(Arc::clone(&mid)).unwrap();
        let root = Arc::new(root.build());

        let index = CodeCellIndex::build(Arc::clone(&root));
        assert_eq!(index.len(), 4);
        for cell in [&root, &mid, &a, &b] {
            assert!(index.get(&cell.hash_hex()).is_some());
        }
    }

    #[test]
    fn test_build_deduplicates_shared_refs() {
        let shared = leaf(7);
        let mut root = CellBuilder::new();
        root.store_ref(Arc::clone(&shared)).unwrap();
        root.store_ref(Arc::clone(&shared)).unwrap();
        let root = Arc::new(root.build());

        let index = CodeCellIndex::build(root);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let root = leaf(3);
        let index = CodeCellIndex::build(Arc::clone(&root));
        let upper = root.hash_hex();
        assert!(index.get(&upper).is_some());
        assert!(index.get(&upper.to_lowercase()).is_some());
        assert!(index.get("00").is_none());
    }

    #[test]
    fn test_single_cell_graph() {
        let root = leaf(5);
        let index = CodeCellIndex::build(root);
        assert_eq!(index.len(), 1);
        assert!(!index.is_empty());
    }
}
