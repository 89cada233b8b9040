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

//! Events the stepping engine emits towards the host.
//!
//! Verbs push events onto an unbounded channel and return; the host drains
//! the receiver afterwards. On the single-threaded host loop this guarantees
//! no event is observable before the invoking verb has returned, and events
//! of one verb arrive in emission order.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A debuggee event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugEvent {
    /// Execution stopped on a breakpoint line.
    StoppedOnBreakpoint,
    /// Execution stopped after a step verb.
    StoppedOnStep,
    /// Execution stopped on the first statement after launch.
    StoppedOnEntry,
    /// The VM terminated; the result arrives through the finished channel.
    End,
    /// A line of emulator debug-log output.
    Output(String),
}

/// Sending half owned by the session.
pub type EventSender = mpsc::UnboundedSender<DebugEvent>;

/// Receiving half handed to the host at preparation.
pub type EventReceiver = mpsc::UnboundedReceiver<DebugEvent>;

/// Create the event channel pair.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
