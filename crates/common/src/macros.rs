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

//! Conditional assertion macros for TDB testing.
//!
//! These macros provide assertions that only execute when the
//! `TDB_TEST_STRICT` environment variable is set at compile time. The engine
//! uses them to check its frame-stack invariants during strict test runs
//! without paying for the checks in normal builds.

/// Assert a condition only when `TDB_TEST_STRICT` is set.
///
/// Behaves like the standard `assert!` macro otherwise.
///
/// # Examples
///
/// ```ignore
/// use tdb_common::tdb_assert;
///
/// let depth = 1;
/// tdb_assert!(depth > 0);
/// tdb_assert!(depth > 0, "depth must stay positive, got {}", depth);
/// ```
#[macro_export]
macro_rules! tdb_assert {
    ($($arg:tt)*) => {
        if option_env!("TDB_TEST_STRICT").is_some() {
            assert!($($arg)*);
        }
    };
}

/// Assert two expressions are equal only when `TDB_TEST_STRICT` is set.
///
/// Behaves like the standard `assert_eq!` macro otherwise.
#[macro_export]
macro_rules! tdb_assert_eq {
    ($($arg:tt)*) => {
        if option_env!("TDB_TEST_STRICT").is_some() {
            assert_eq!($($arg)*);
        }
    };
}

/// Assert two expressions are not equal only when `TDB_TEST_STRICT` is set.
///
/// Behaves like the standard `assert_ne!` macro otherwise.
#[macro_export]
macro_rules! tdb_assert_ne {
    ($($arg:tt)*) => {
        if option_env!("TDB_TEST_STRICT").is_some() {
            assert_ne!($($arg)*);
        }
    };
}
