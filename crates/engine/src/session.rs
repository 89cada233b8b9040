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

//! The debug session and its stepping engine.
//!
//! A session owns the emulator handle, the code-cell index, the source map,
//! the breakpoint store, and the frame stack. The four stepping verbs all
//! run the same inner loop: single-step the VM, decode a marker at the new
//! code position, maintain the frame stack, and stop when the verb's
//! condition is met. Marker decode failures never stop anything; they only
//! mean the current instruction carries no source information.
//!
//! Stop and output events are pushed onto the event channel and become
//! observable only after the invoking verb returns; the VM's final result
//! travels through a one-shot channel handed out at preparation.

use std::{path::Path, sync::Arc};

use eyre::{ensure, eyre, Result};
use tdb_common::{
    tdb_assert,
    types::{Breakpoint, Cell, CodePos, DebugInfo, StackFrame, TvmValue},
};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::{
    breakpoints::BreakpointStore,
    emulator::{EmulationResult, Emulator, SessionKind},
    events::{event_channel, DebugEvent, EventReceiver, EventSender},
    index::CodeCellIndex,
    marker::decode_marker,
    source_map::{SourceLocation, SourceMap, SourceMapEntry},
};

/// Receiving ends handed to the host at preparation: the event stream and
/// the one-shot final result.
#[derive(Debug)]
pub struct SessionHandles {
    /// Debug events, in emission order.
    pub events: EventReceiver,
    /// Resolved exactly once, when the VM terminates.
    pub finished: oneshot::Receiver<EmulationResult>,
}

/// Stop condition of one stepping verb, captured at invocation so depth
/// comparisons refer to the call-site frame depth.
#[derive(Debug, Clone, Copy)]
enum StopCondition {
    /// Stop on the first statement after launch.
    Entry,
    /// Stop on a statement whose line has a breakpoint.
    Breakpoint,
    /// Stop on the next statement.
    AnyStatement,
    /// Stop on the next statement at or above the captured depth.
    DepthAtMost(usize),
    /// Stop on the next statement strictly above the captured depth.
    DepthBelow(usize),
}

/// A live debug session over one contract execution.
pub struct DebugSession<E: Emulator> {
    emulator: Option<E>,
    kind: SessionKind,
    cells: CodeCellIndex,
    source_map: SourceMap,
    breakpoints: BreakpointStore,
    frames: Vec<StackFrame>,
    /// DebugInfoIndex of the statement marker we are stopped on, if any.
    /// Gates variable inspection.
    current: Option<u64>,
    events: EventSender,
    finished: Option<oneshot::Sender<EmulationResult>>,
}

impl<E: Emulator> DebugSession<E> {
    /// Prepare a session: validate emulator setup, index the code graph,
    /// and load the source map.
    ///
    /// Transaction emulators whose setup reported a result other than 1
    /// fail here, before any stepping. Relative paths in `debug_info` are
    /// resolved against `source_root`.
    pub fn prepare(
        mut emulator: E,
        code_root: Arc<Cell>,
        debug_info: &DebugInfo,
        source_root: &Path,
    ) -> Result<(Self, SessionHandles)> {
        emulator.verify_setup()?;

        let kind = emulator.kind();
        let cells = CodeCellIndex::build(code_root);
        let source_map = SourceMap::from_debug_info(debug_info, source_root);
        let (events, event_rx) = event_channel();
        let (finished_tx, finished_rx) = oneshot::channel();

        info!(
            ?kind,
            cells = cells.len(),
            entries = source_map.len(),
            globals = source_map.globals().len(),
            "Prepared debug session"
        );

        let session = Self {
            emulator: Some(emulator),
            kind,
            cells,
            source_map,
            breakpoints: BreakpointStore::new(),
            frames: Vec::new(),
            current: None,
            events,
            finished: Some(finished_tx),
        };
        Ok((session, SessionHandles { events: event_rx, finished: finished_rx }))
    }

    /// The session kind.
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// True while the emulator handle is alive (before termination and
    /// before any fatal error).
    pub fn is_running(&self) -> bool {
        self.emulator.is_some()
    }

    /// The frame stack, outermost first. The top frame's line tracks the
    /// latest statement marker.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// The loaded source map, for host-side queries such as valid
    /// breakpoint lines.
    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Where execution is stopped, when it is stopped on a statement.
    pub fn current_location(&self) -> Option<&SourceLocation> {
        self.current.and_then(|index| self.source_map.entry(index)).map(SourceMapEntry::location)
    }

    /// Drop all breakpoints of `path`.
    pub fn clear_breakpoints(&mut self, path: &Path) {
        self.breakpoints.clear(path);
    }

    /// Set a breakpoint; verification is decided against the source map now
    /// and frozen in the returned record.
    pub fn set_breakpoint(&mut self, path: &Path, line: u32) -> Breakpoint {
        let verified = self.source_map.is_line_available(path, line);
        self.breakpoints.set(path, line, verified)
    }

    /// The breakpoints of `path`, in insertion order.
    pub fn breakpoints(&self, path: &Path) -> &[Breakpoint] {
        self.breakpoints.breakpoints(path)
    }

    /// Launch verb. With `stop_on_entry` the session stops on the first
    /// statement and emits [`DebugEvent::StoppedOnEntry`]; otherwise it
    /// behaves like [`continue_running`].
    ///
    /// [`continue_running`]: DebugSession::continue_running
    pub fn start(&mut self, stop_on_entry: bool) -> Result<()> {
        if stop_on_entry {
            self.run(StopCondition::Entry)
        } else {
            self.run(StopCondition::Breakpoint)
        }
    }

    /// Run until a statement with a matching breakpoint, or termination.
    pub fn continue_running(&mut self) -> Result<()> {
        self.run(StopCondition::Breakpoint)
    }

    /// Run until the next statement, entering calls.
    pub fn step_in(&mut self) -> Result<()> {
        self.run(StopCondition::AnyStatement)
    }

    /// Run until the next statement at or above the current frame depth.
    pub fn step_over(&mut self) -> Result<()> {
        let depth = self.frames.len();
        self.run(StopCondition::DepthAtMost(depth))
    }

    /// Run until the next statement above the current frame depth.
    pub fn step_out(&mut self) -> Result<()> {
        let depth = self.frames.len();
        self.run(StopCondition::DepthBelow(depth))
    }

    /// Locals at the current stop: marker variable names paired with
    /// operand-stack values.
    ///
    /// Returns `Ok(None)` when not stopped on a statement marker. A stack
    /// shorter than the name list pads with null.
    pub fn locals(&mut self) -> Result<Option<Vec<(String, TvmValue)>>> {
        let Some(index) = self.current else { return Ok(None) };
        let variables = match self.source_map.entry(index) {
            Some(SourceMapEntry::Statement { variables, .. }) => variables.clone(),
            _ => return Ok(None),
        };
        if variables.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let stack = self.emulator_mut()?.stack()?;
        Ok(Some(
            variables
                .into_iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = stack.get(i).cloned().unwrap_or(TvmValue::Null);
                    (name, value)
                })
                .collect(),
        ))
    }

    /// Globals at the current stop: configured names paired with C7 tuple
    /// items, offset by one (slot 0 is the VM's own context).
    ///
    /// Returns `Ok(None)` when not stopped on a statement marker or when C7
    /// is not a tuple. Missing tuple items pad with null.
    pub fn globals(&mut self) -> Result<Option<Vec<(String, TvmValue)>>> {
        if self.current.is_none() {
            return Ok(None);
        }
        let names = self.source_map.globals().to_vec();
        if names.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let c7 = self.emulator_mut()?.c7()?;
        let TvmValue::Tuple { items } = c7 else { return Ok(None) };
        Ok(Some(
            names
                .into_iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = items.get(i + 1).cloned().unwrap_or(TvmValue::Null);
                    (name, value)
                })
                .collect(),
        ))
    }

    /// Run one verb to its stop condition or to VM termination, releasing
    /// the emulator handle on every error path.
    fn run(&mut self, condition: StopCondition) -> Result<()> {
        let result = self.step_until(condition);
        if result.is_err() {
            // The handle must not survive a failed verb.
            self.emulator = None;
        }
        result
    }

    fn step_until(&mut self, condition: StopCondition) -> Result<()> {
        self.current = None;

        loop {
            let finished = self.emulator_mut()?.step()?;
            self.forward_log();
            if finished {
                return self.finalize();
            }

            let pos = self.emulator_mut()?.code_pos()?;
            let Some(index) = self.marker_at(&pos) else { continue };
            let Some(entry) = self.source_map.entry(index).cloned() else { continue };

            match entry {
                SourceMapEntry::Statement { location, first_statement, .. } => {
                    if first_statement || self.frames.is_empty() {
                        self.frames.push(StackFrame::new(
                            location.function.clone(),
                            location.path.clone(),
                            location.line,
                        ));
                        // Snapshot the entry depth into the continuation
                        // parameter so a later catch can unwind to it.
                        let depth = self.frames.len() as i64;
                        self.emulator_mut()?.set_cont_param(depth)?;
                    }
                    if let Some(top) = self.frames.last_mut() {
                        top.line = location.line;
                    }

                    let stop = match condition {
                        StopCondition::Entry => Some(DebugEvent::StoppedOnEntry),
                        StopCondition::AnyStatement => Some(DebugEvent::StoppedOnStep),
                        StopCondition::Breakpoint
                            if self.breakpoints.has_breakpoint(&location.path, location.line) =>
                        {
                            Some(DebugEvent::StoppedOnBreakpoint)
                        }
                        StopCondition::DepthAtMost(d0) if self.frames.len() <= d0 => {
                            Some(DebugEvent::StoppedOnStep)
                        }
                        StopCondition::DepthBelow(d0) if self.frames.len() < d0 => {
                            Some(DebugEvent::StoppedOnStep)
                        }
                        _ => None,
                    };

                    if let Some(event) = stop {
                        self.current = Some(index);
                        debug!(
                            %pos,
                            index,
                            line = location.line,
                            depth = self.frames.len(),
                            ?event,
                            "Stopped"
                        );
                        self.emit(event);
                        return Ok(());
                    }
                }
                SourceMapEntry::Return { .. } => {
                    tdb_assert!(!self.frames.is_empty(), "return marker with empty frame stack");
                    self.frames.pop();
                }
                SourceMapEntry::Catch { .. } => {
                    let depth = self.emulator_mut()?.cont_param()?;
                    let depth = usize::try_from(depth).unwrap_or(0);
                    debug!(%pos, from = self.frames.len(), to = depth, "Catch unwound frames");
                    self.frames.truncate(depth);
                }
            }
        }
    }

    /// Termination path: end event, kind-checked result, handle teardown,
    /// one-shot delivery.
    fn finalize(&mut self) -> Result<()> {
        self.current = None;
        self.frames.clear();
        self.emit(DebugEvent::End);

        let mut emulator =
            self.emulator.take().ok_or_else(|| eyre!("finalize without a live emulator"))?;
        let result = emulator.take_result()?;
        drop(emulator);

        ensure!(
            result.kind() == self.kind,
            "emulator returned a {:?} result for a {:?} session",
            result.kind(),
            self.kind
        );
        info!(kind = ?self.kind, "Emulation finished");

        if let Some(tx) = self.finished.take() {
            // The host may have dropped its receiver; that is its choice.
            let _ = tx.send(result);
        }
        Ok(())
    }

    fn marker_at(&self, pos: &CodePos) -> Option<u64> {
        let cell = self.cells.get(&pos.cell_hash)?;
        decode_marker(cell, pos.offset)
    }

    fn forward_log(&mut self) {
        let lines = match self.emulator.as_mut() {
            Some(emulator) => emulator.drain_log(),
            None => return,
        };
        for line in lines {
            self.emit(DebugEvent::Output(line));
        }
    }

    fn emit(&self, event: DebugEvent) {
        // A departed host is not an engine error.
        let _ = self.events.send(event);
    }

    fn emulator_mut(&mut self) -> Result<&mut E> {
        self.emulator.as_mut().ok_or_else(|| eyre!("debug session is not running"))
    }
}

impl<E: Emulator> std::fmt::Debug for DebugSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSession")
            .field("kind", &self.kind)
            .field("running", &self.is_running())
            .field("cells", &self.cells.len())
            .field("entries", &self.source_map.len())
            .field("depth", &self.frames.len())
            .finish()
    }
}
