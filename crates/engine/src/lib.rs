//! TDB Engine - The debuggee engine for TVM contract debugging
//!
//! This crate drives a single-stepping TVM emulator and turns its low-level
//! program counter into source-level debugging: it indexes the code-cell
//! graph, decodes the debug-info markers embedded in the bytecode, maintains
//! a source-level call stack and a breakpoint set, and implements the
//! stepping verbs (continue, step-in, step-over, step-out) on top of the
//! emulator's single-step primitive.
//!
//! The emulator itself, the DAP transport, and process bootstrap are the
//! host's business; the engine is driven through [`DebugSession`] and talks
//! back through an event channel and a one-shot result.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod breakpoints;
mod emulator;
mod events;
mod index;
mod session;
mod source_map;

pub mod marker;
pub mod test_utils;

pub use breakpoints::BreakpointStore;
pub use emulator::{
    EmulationResult, Emulator, GetMethodResult, SessionKind, TransactionResult,
};
pub use events::{event_channel, DebugEvent, EventReceiver, EventSender};
pub use index::CodeCellIndex;
pub use session::{DebugSession, SessionHandles};
pub use source_map::{SourceLocation, SourceMap, SourceMapEntry};
