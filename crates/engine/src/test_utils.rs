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

//! Test utilities: a scripted emulator and a marker-trace builder.
//!
//! [`TraceBuilder`] lays real markers into a real code cell and produces the
//! matching debug info plus the per-step code positions, so scenario tests
//! drive the full pipeline (index, decoder, source map) rather than a mock
//! of it. [`ScriptedEmulator`] replays those positions step by step.
//!
//! These helpers panic on misuse (cell capacity, payload budget); they are
//! test fixtures, not production surface.

use std::{mem, sync::Arc};

use eyre::{bail, Result};
use tdb_common::types::{
    Cell, CellBuilder, CodePos, DebugInfo, DebugInfoLocation, GlobalEntry, TvmValue,
};

use crate::{
    emulator::{EmulationResult, Emulator, GetMethodResult, SessionKind},
    marker::encode_marker,
};

/// One scripted VM step: the code position reported after the step and an
/// optional continuation-parameter value that becomes visible at it.
///
/// The override models the emulator switching continuations: the slot the
/// engine reads at a catch marker belongs to the catch continuation, not to
/// whatever the engine last wrote.
#[derive(Debug, Clone)]
pub struct ScriptedStep {
    /// Position reported by `code_pos` after this step.
    pub pos: CodePos,
    /// When set, the continuation-parameter slot takes this value before
    /// the position is reported.
    pub cont_param: Option<i64>,
}

/// Everything a scenario needs: the code cell, the debug info describing
/// its markers, and the step script that walks them.
#[derive(Debug, Clone)]
pub struct TraceProgram {
    /// Root of the (single-cell) code graph.
    pub code_root: Arc<Cell>,
    /// Debug info whose locations match the embedded markers.
    pub debug_info: DebugInfo,
    /// One entry per VM step.
    pub steps: Vec<ScriptedStep>,
}

/// Builds a marker trace: each event appends a location record, encodes the
/// matching marker into the code cell, and schedules a step landing on it.
#[derive(Debug, Default)]
pub struct TraceBuilder {
    locations: Vec<DebugInfoLocation>,
    globals: Vec<GlobalEntry>,
    builder: CellBuilder,
    steps: Vec<PendingStep>,
}

#[derive(Debug, Clone)]
enum PendingStep {
    Marker { offset: usize, cont_param: Option<i64> },
    PlainBits { offset: usize },
    UnknownCell,
}

impl TraceBuilder {
    /// Start an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a global name (order matters).
    pub fn global(mut self, name: &str) -> Self {
        self.globals.push(GlobalEntry { name: name.to_string() });
        self
    }

    /// A statement marker.
    pub fn stmt(self, file: &str, line: u32, func: &str) -> Self {
        self.stmt_full(file, line, func, &[], false)
    }

    /// A statement marker with variables and the first-statement hint.
    pub fn stmt_full(mut self, file: &str, line: u32, func: &str, vars: &[&str], first: bool) -> Self {
        let vars =
            if vars.is_empty() { None } else { Some(vars.iter().map(|v| v.to_string()).collect()) };
        self.push_marker(
            DebugInfoLocation {
                file: file.to_string(),
                line,
                func: func.to_string(),
                vars,
                first_stmt: first,
                ..Default::default()
            },
            None,
        );
        self
    }

    /// A function-entry statement marker.
    pub fn entry(self, file: &str, line: u32, func: &str) -> Self {
        self.stmt_full(file, line, func, &[], true)
    }

    /// A return marker.
    pub fn ret(mut self, file: &str, line: u32, func: &str) -> Self {
        self.push_marker(
            DebugInfoLocation {
                file: file.to_string(),
                line,
                func: func.to_string(),
                ret: true,
                ..Default::default()
            },
            None,
        );
        self
    }

    /// A catch marker whose continuation slot reports `restore_depth`.
    pub fn catch(mut self, file: &str, line: u32, func: &str, restore_depth: i64) -> Self {
        self.push_marker(
            DebugInfoLocation {
                file: file.to_string(),
                line,
                func: func.to_string(),
                is_catch: true,
                ..Default::default()
            },
            Some(restore_depth),
        );
        self
    }

    /// A step landing on plain instruction bits (no marker decodes there).
    pub fn plain_step(mut self) -> Self {
        let offset = self.builder.bit_len();
        // An arbitrary non-marker byte; the opcode check rejects it.
        self.builder.store_uint(0x5A, 8).expect("trace cell overflow");
        self.steps.push(PendingStep::PlainBits { offset });
        self
    }

    /// A step reporting a cell hash that is not in the code graph.
    pub fn unknown_cell_step(mut self) -> Self {
        self.steps.push(PendingStep::UnknownCell);
        self
    }

    /// Finish the trace.
    pub fn build(self) -> TraceProgram {
        let code_root = Arc::new(self.builder.build());
        let hash = code_root.hash_hex();
        let steps = self
            .steps
            .into_iter()
            .map(|step| match step {
                PendingStep::Marker { offset, cont_param } => {
                    ScriptedStep { pos: CodePos::new(hash.clone(), offset), cont_param }
                }
                PendingStep::PlainBits { offset } => {
                    ScriptedStep { pos: CodePos::new(hash.clone(), offset), cont_param: None }
                }
                PendingStep::UnknownCell => {
                    ScriptedStep { pos: CodePos::new("00".repeat(32), 0), cont_param: None }
                }
            })
            .collect();

        TraceProgram {
            code_root,
            debug_info: DebugInfo { locations: self.locations, globals: self.globals },
            steps,
        }
    }

    fn push_marker(&mut self, location: DebugInfoLocation, cont_param: Option<i64>) {
        let index = self.locations.len() as u64;
        let offset = self.builder.bit_len();
        encode_marker(&mut self.builder, index).expect("trace cell overflow");
        self.locations.push(location);
        self.steps.push(PendingStep::Marker { offset, cont_param });
    }
}

/// An [`Emulator`] that replays a fixed step script.
#[derive(Debug)]
pub struct ScriptedEmulator {
    kind: SessionKind,
    setup_result: i32,
    steps: Vec<ScriptedStep>,
    cursor: usize,
    stack: Vec<TvmValue>,
    c7: TvmValue,
    cont_param: i64,
    pending_log: Vec<String>,
    result: EmulationResult,
    result_taken: bool,
    fail_at_step: Option<usize>,
}

impl ScriptedEmulator {
    /// Get-method emulator over a step script.
    pub fn get_method(steps: Vec<ScriptedStep>) -> Self {
        Self {
            kind: SessionKind::GetMethod,
            setup_result: 1,
            steps,
            cursor: 0,
            stack: Vec::new(),
            c7: TvmValue::Null,
            cont_param: 0,
            pending_log: Vec::new(),
            result: EmulationResult::GetMethod(GetMethodResult::default()),
            result_taken: false,
            fail_at_step: None,
        }
    }

    /// Transaction emulator whose setup reported `setup_result`.
    pub fn transaction(steps: Vec<ScriptedStep>, setup_result: i32, result: EmulationResult) -> Self {
        Self {
            kind: SessionKind::Transaction,
            setup_result,
            result,
            ..Self::get_method(steps)
        }
    }

    /// Replace the operand stack reported to the engine.
    pub fn with_stack(mut self, stack: Vec<TvmValue>) -> Self {
        self.stack = stack;
        self
    }

    /// Replace the C7 register reported to the engine.
    pub fn with_c7(mut self, c7: TvmValue) -> Self {
        self.c7 = c7;
        self
    }

    /// Replace the final result.
    pub fn with_result(mut self, result: EmulationResult) -> Self {
        self.result = result;
        self
    }

    /// Queue a debug-log line for the next drain.
    pub fn queue_log(mut self, line: &str) -> Self {
        self.pending_log.push(line.to_string());
        self
    }

    /// Make the step with this 0-based number fail.
    pub fn failing_at(mut self, step: usize) -> Self {
        self.fail_at_step = Some(step);
        self
    }

    /// Number of steps executed so far.
    pub fn steps_taken(&self) -> usize {
        self.cursor
    }

    /// The continuation-parameter slot as last written or scripted.
    pub fn cont_param_value(&self) -> i64 {
        self.cont_param
    }
}

impl Emulator for ScriptedEmulator {
    fn kind(&self) -> SessionKind {
        self.kind
    }

    fn verify_setup(&mut self) -> Result<()> {
        if self.kind == SessionKind::Transaction && self.setup_result != 1 {
            bail!("transaction emulator setup failed with result code {}", self.setup_result);
        }
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        if self.fail_at_step == Some(self.cursor) {
            bail!("scripted emulator failure at step {}", self.cursor);
        }
        if self.cursor >= self.steps.len() {
            return Ok(true);
        }
        if let Some(param) = self.steps[self.cursor].cont_param {
            self.cont_param = param;
        }
        self.cursor += 1;
        Ok(false)
    }

    fn code_pos(&mut self) -> Result<CodePos> {
        if self.cursor == 0 {
            bail!("code_pos before the first step");
        }
        Ok(self.steps[self.cursor - 1].pos.clone())
    }

    fn stack(&mut self) -> Result<Vec<TvmValue>> {
        Ok(self.stack.clone())
    }

    fn c7(&mut self) -> Result<TvmValue> {
        Ok(self.c7.clone())
    }

    fn cont_param(&mut self) -> Result<i64> {
        Ok(self.cont_param)
    }

    fn set_cont_param(&mut self, value: i64) -> Result<()> {
        self.cont_param = value;
        Ok(())
    }

    fn take_result(&mut self) -> Result<EmulationResult> {
        if self.result_taken {
            bail!("emulation result already taken");
        }
        self.result_taken = true;
        Ok(self.result.clone())
    }

    fn drain_log(&mut self) -> Vec<String> {
        mem::take(&mut self.pending_log)
    }
}
