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

//! The emulator seam.
//!
//! The actual TVM emulator is a native library owned by the host process;
//! the engine only ever talks to it through [`Emulator`]. Get-method and
//! transaction sessions expose the same surface, so the kind-specific C
//! calls live entirely inside the adapter implementing this trait. The
//! scripted emulator in [`crate::test_utils`] implements it for tests.

use eyre::Result;
use serde::{Deserialize, Serialize};
use tdb_common::types::{CodePos, TvmValue};

/// What kind of contract execution the session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    /// A read-only get-method invocation.
    GetMethod,
    /// State-mutating inbound-message processing.
    Transaction,
}

/// Final payload of a finished emulation, matching the session kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmulationResult {
    /// Result of a get-method run.
    GetMethod(GetMethodResult),
    /// Result of a transaction run.
    Transaction(TransactionResult),
}

impl EmulationResult {
    /// The session kind this result belongs to.
    pub fn kind(&self) -> SessionKind {
        match self {
            Self::GetMethod(_) => SessionKind::GetMethod,
            Self::Transaction(_) => SessionKind::Transaction,
        }
    }
}

/// Outcome of a get-method run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMethodResult {
    /// TVM exit code. 0 and 1 are success by convention.
    pub exit_code: i32,
    /// Gas consumed by the run.
    pub gas_used: u64,
    /// The operand stack left behind by the method.
    pub stack: Vec<TvmValue>,
}

/// Outcome of a transaction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Whether the transaction aborted.
    pub aborted: bool,
    /// Compute-phase exit code, when a compute phase ran.
    pub exit_code: Option<i32>,
    /// Base64-encoded BOC of the produced transaction.
    pub transaction: String,
}

/// Synchronous, exclusively owned handle to a single-stepping TVM emulator.
///
/// All calls are dispatched from the stepping loop on one thread; the
/// emulator is never re-entered. Teardown is `Drop`: the engine drops the
/// handle at finalization and on every error path.
pub trait Emulator {
    /// The session kind this emulator was set up for.
    fn kind(&self) -> SessionKind;

    /// Validate the setup outcome before any stepping.
    ///
    /// Transaction setup reports a result code; anything other than 1 is a
    /// fatal preparation error. Get-method setup cannot fail this way.
    fn verify_setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Execute one VM instruction. Returns true when the VM has terminated.
    fn step(&mut self) -> Result<bool>;

    /// The instruction pointer after the last step.
    fn code_pos(&mut self) -> Result<CodePos>;

    /// The current operand stack, position 0 first.
    fn stack(&mut self) -> Result<Vec<TvmValue>>;

    /// The C7 context register. Expected to be a tuple, but the engine
    /// tolerates anything.
    fn c7(&mut self) -> Result<TvmValue>;

    /// Read the current continuation's parameter slot.
    fn cont_param(&mut self) -> Result<i64>;

    /// Write the current continuation's parameter slot.
    fn set_cont_param(&mut self, value: i64) -> Result<()>;

    /// Fetch the kind-specific final result. Only meaningful after [`step`]
    /// reported termination.
    ///
    /// [`step`]: Emulator::step
    fn take_result(&mut self) -> Result<EmulationResult>;

    /// Drain any debug-log lines the VM produced since the last call.
    ///
    /// The native adapter wires the emulator's log callback into a buffer
    /// behind this method; the engine forwards the lines as output events.
    fn drain_log(&mut self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emulation_result_kind() {
        let gm = EmulationResult::GetMethod(GetMethodResult::default());
        assert_eq!(gm.kind(), SessionKind::GetMethod);
        let tx = EmulationResult::Transaction(TransactionResult::default());
        assert_eq!(tx.kind(), SessionKind::Transaction);
    }

    #[test]
    fn test_result_serde_roundtrip() {
        let result = EmulationResult::GetMethod(GetMethodResult {
            exit_code: 0,
            gas_used: 3308,
            stack: vec![TvmValue::int(7)],
        });
        let json = serde_json::to_string(&result).unwrap();
        let back: EmulationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
