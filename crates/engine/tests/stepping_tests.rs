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

//! End-to-end stepping scenarios over a scripted emulator.
//!
//! Every scenario lays real markers into a real code cell, so these tests
//! exercise the code-cell index, the marker decoder, and the source map
//! together with the stepping state machine.

use std::path::Path;

use tdb_common::types::TvmValue;
use tdb_engine::test_utils::{ScriptedEmulator, TraceBuilder, TraceProgram};
use tdb_engine::{
    DebugEvent, DebugSession, EmulationResult, EventReceiver, GetMethodResult, SessionHandles,
    SessionKind, TransactionResult,
};
use tracing::info;

const SOURCE_ROOT: &str = "/proj";

fn prepare(
    program: &TraceProgram,
    emulator: ScriptedEmulator,
) -> (DebugSession<ScriptedEmulator>, SessionHandles) {
    DebugSession::prepare(
        emulator,
        program.code_root.clone(),
        &program.debug_info,
        Path::new(SOURCE_ROOT),
    )
    .expect("prepare failed")
}

fn prepare_get_method(program: &TraceProgram) -> (DebugSession<ScriptedEmulator>, SessionHandles) {
    prepare(program, ScriptedEmulator::get_method(program.steps.clone()))
}

fn drain(events: &mut EventReceiver) -> Vec<DebugEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn src(file: &str) -> std::path::PathBuf {
    Path::new(SOURCE_ROOT).join(file)
}

#[test]
fn test_s1_continue_stops_on_breakpoint() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new()
        .entry("a.fc", 10, "f")
        .stmt("a.fc", 11, "f")
        .stmt("a.fc", 12, "f")
        .build();
    let (mut session, mut handles) = prepare_get_method(&program);

    let bp = session.set_breakpoint(&src("a.fc"), 12);
    assert!(bp.verified);

    session.continue_running().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnBreakpoint]);
    let frames = session.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].function, "f");
    assert_eq!(frames[0].path, src("a.fc"));
    assert_eq!(frames[0].line, 12);
    let location = session.current_location().unwrap();
    assert_eq!((location.line, location.function.as_str()), (12, "f"));
}

#[test]
fn test_s2_step_over_skips_call() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new()
        .entry("a.fc", 10, "f")
        .entry("a.fc", 20, "g")
        .ret("a.fc", 21, "g")
        .stmt("a.fc", 11, "f")
        .build();
    let (mut session, mut handles) = prepare_get_method(&program);

    session.step_in().unwrap();
    assert_eq!(session.current_location().unwrap().line, 10);
    drain(&mut handles.events);

    session.step_over().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnStep]);
    let frames = session.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].function, "f");
    assert_eq!(frames[0].line, 11);
}

#[test]
fn test_s3_step_in_enters_call() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new()
        .entry("a.fc", 10, "f")
        .entry("a.fc", 20, "g")
        .ret("a.fc", 21, "g")
        .stmt("a.fc", 11, "f")
        .build();
    let (mut session, mut handles) = prepare_get_method(&program);

    session.step_in().unwrap();
    drain(&mut handles.events);

    session.step_in().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnStep]);
    let frames = session.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].function, "f");
    assert_eq!(frames[1].function, "g");
    assert_eq!(frames[1].line, 20);
}

#[test]
fn test_s4_step_out_pops_callee() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new()
        .entry("a.fc", 10, "f")
        .entry("a.fc", 20, "g")
        .ret("a.fc", 21, "g")
        .stmt("a.fc", 11, "f")
        .build();
    let (mut session, mut handles) = prepare_get_method(&program);

    session.step_in().unwrap();
    session.step_in().unwrap();
    assert_eq!(session.frames().len(), 2);
    drain(&mut handles.events);

    session.step_out().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnStep]);
    let frames = session.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].function, "f");
    assert_eq!(frames[0].line, 11);
}

#[test]
fn test_s5_catch_unwinds_frames() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    // The slot value at the catch is scripted to 1: the depth captured at
    // f's entry, surviving on the catch continuation.
    let program = TraceBuilder::new()
        .entry("a.fc", 1, "f")
        .entry("a.fc", 2, "g")
        .entry("a.fc", 3, "h")
        .catch("a.fc", 6, "f", 1)
        .stmt("a.fc", 7, "f")
        .build();
    let (mut session, mut handles) = prepare_get_method(&program);

    session.step_in().unwrap();
    session.step_in().unwrap();
    session.step_in().unwrap();
    assert_eq!(session.frames().len(), 3);
    drain(&mut handles.events);

    // The next statement lies past the catch marker.
    session.step_in().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnStep]);
    let frames = session.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].function, "f");
    assert_eq!(frames[0].line, 7);
}

#[test]
fn test_s6_markerless_steps_are_skipped() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new()
        .plain_step()
        .unknown_cell_step()
        .stmt_full("a.fc", 5, "f", &[], true)
        .build();
    let (mut session, mut handles) = prepare_get_method(&program);

    session.step_in().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnStep]);
    assert_eq!(session.frames().len(), 1);
    assert_eq!(session.current_location().unwrap().line, 5);
}

#[test]
fn test_frames_empty_before_first_statement_and_after_end() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().entry("a.fc", 1, "f").ret("a.fc", 2, "f").build();
    let (mut session, mut handles) = prepare_get_method(&program);

    assert!(session.frames().is_empty());

    session.step_in().unwrap();
    assert_eq!(session.frames().len(), 1);
    drain(&mut handles.events);

    // The return marker pops the frame, then the VM terminates.
    session.step_in().unwrap();
    assert!(session.frames().is_empty());
    assert!(!session.is_running());
    assert_eq!(drain(&mut handles.events), vec![DebugEvent::End]);
}

#[test]
fn test_end_delivers_result_once() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let result = EmulationResult::GetMethod(GetMethodResult {
        exit_code: 0,
        gas_used: 3308,
        stack: vec![TvmValue::int(42)],
    });
    let program = TraceBuilder::new().entry("a.fc", 1, "f").build();
    let emulator = ScriptedEmulator::get_method(program.steps.clone()).with_result(result.clone());
    let (mut session, mut handles) = prepare(&program, emulator);

    session.continue_running().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::End]);
    assert_eq!(handles.finished.try_recv().unwrap(), result);
    assert!(!session.is_running());

    // A verb after termination is host misuse, reported as a plain error.
    assert!(session.step_in().is_err());
}

#[test]
fn test_continue_without_breakpoints_runs_to_end() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new()
        .entry("a.fc", 1, "f")
        .stmt("a.fc", 2, "f")
        .stmt("a.fc", 3, "f")
        .build();
    let (mut session, mut handles) = prepare_get_method(&program);

    session.continue_running().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::End]);
    assert!(handles.finished.try_recv().is_ok());
}

#[test]
fn test_start_with_stop_on_entry() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().entry("a.fc", 1, "f").stmt("a.fc", 2, "f").build();
    let (mut session, mut handles) = prepare_get_method(&program);

    session.start(true).unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnEntry]);
    assert_eq!(session.current_location().unwrap().line, 1);
}

#[test]
fn test_start_without_stop_on_entry_honors_breakpoints() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().entry("a.fc", 1, "f").stmt("a.fc", 2, "f").build();
    let (mut session, mut handles) = prepare_get_method(&program);
    session.set_breakpoint(&src("a.fc"), 2);

    session.start(false).unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnBreakpoint]);
    assert_eq!(session.current_location().unwrap().line, 2);
}

#[test]
fn test_breakpoint_verification_matches_available_lines() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().entry("a.fc", 10, "f").stmt("a.fc", 12, "f").build();
    let (mut session, _handles) = prepare_get_method(&program);

    assert!(session.set_breakpoint(&src("a.fc"), 10).verified);
    assert!(session.set_breakpoint(&src("a.fc"), 12).verified);
    // Line 11 never appears in the source map.
    assert!(!session.set_breakpoint(&src("a.fc"), 11).verified);
    assert!(!session.set_breakpoint(&src("other.fc"), 10).verified);
}

#[test]
fn test_breakpoint_duplicates_and_clear() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().entry("a.fc", 10, "f").build();
    let (mut session, _handles) = prepare_get_method(&program);

    let first = session.set_breakpoint(&src("a.fc"), 10);
    let second = session.set_breakpoint(&src("a.fc"), 10);
    assert_ne!(first.id, second.id);
    assert_eq!(session.breakpoints(&src("a.fc")).len(), 2);

    session.clear_breakpoints(&src("a.fc"));
    session.clear_breakpoints(&src("a.fc"));
    assert!(session.breakpoints(&src("a.fc")).is_empty());
}

#[test]
fn test_locals_pair_stack_with_marker_variables() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().stmt_full("a.fc", 10, "f", &["x", "y"], true).build();
    let emulator = ScriptedEmulator::get_method(program.steps.clone())
        .with_stack(vec![TvmValue::int(1), TvmValue::int(2), TvmValue::int(3)]);
    let (mut session, _handles) = prepare(&program, emulator);

    // Before any stop, locals are unavailable.
    assert_eq!(session.locals().unwrap(), None);

    session.step_in().unwrap();

    let locals = session.locals().unwrap().unwrap();
    assert_eq!(
        locals,
        vec![("x".to_string(), TvmValue::int(1)), ("y".to_string(), TvmValue::int(2))]
    );
}

#[test]
fn test_locals_pad_short_stack_with_null() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().stmt_full("a.fc", 10, "f", &["x", "y"], true).build();
    let emulator =
        ScriptedEmulator::get_method(program.steps.clone()).with_stack(vec![TvmValue::int(1)]);
    let (mut session, _handles) = prepare(&program, emulator);

    session.step_in().unwrap();

    let locals = session.locals().unwrap().unwrap();
    assert_eq!(locals[1], ("y".to_string(), TvmValue::Null));
}

#[test]
fn test_globals_skip_first_tuple_slot() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new()
        .global("counter")
        .global("owner")
        .entry("a.fc", 1, "f")
        .build();
    let c7 = TvmValue::tuple(vec![
        TvmValue::tuple(vec![TvmValue::int(0)]), // VM context, skipped
        TvmValue::int(10),
        TvmValue::int(20),
    ]);
    let emulator = ScriptedEmulator::get_method(program.steps.clone()).with_c7(c7);
    let (mut session, _handles) = prepare(&program, emulator);

    session.step_in().unwrap();

    let globals = session.globals().unwrap().unwrap();
    assert_eq!(
        globals,
        vec![
            ("counter".to_string(), TvmValue::int(10)),
            ("owner".to_string(), TvmValue::int(20)),
        ]
    );
}

#[test]
fn test_globals_pad_and_reject_non_tuple_c7() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program =
        TraceBuilder::new().global("a").global("b").entry("a.fc", 1, "f").build();

    // Tuple shorter than the global list pads with null.
    let short_c7 = TvmValue::tuple(vec![TvmValue::Null, TvmValue::int(1)]);
    let emulator = ScriptedEmulator::get_method(program.steps.clone()).with_c7(short_c7);
    let (mut session, _handles) = prepare(&program, emulator);
    session.step_in().unwrap();
    let globals = session.globals().unwrap().unwrap();
    assert_eq!(globals[0], ("a".to_string(), TvmValue::int(1)));
    assert_eq!(globals[1], ("b".to_string(), TvmValue::Null));

    // A non-tuple C7 makes globals unavailable, not an error.
    let emulator = ScriptedEmulator::get_method(program.steps.clone()).with_c7(TvmValue::int(5));
    let (mut session, _handles) = prepare(&program, emulator);
    session.step_in().unwrap();
    assert_eq!(session.globals().unwrap(), None);
}

#[test]
fn test_output_events_precede_stop() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().entry("a.fc", 1, "f").build();
    let emulator = ScriptedEmulator::get_method(program.steps.clone())
        .queue_log("gas remaining: 9999")
        .queue_log("executing PUSHINT");
    let (mut session, mut handles) = prepare(&program, emulator);

    assert!(drain(&mut handles.events).is_empty());

    session.step_in().unwrap();

    assert_eq!(
        drain(&mut handles.events),
        vec![
            DebugEvent::Output("gas remaining: 9999".to_string()),
            DebugEvent::Output("executing PUSHINT".to_string()),
            DebugEvent::StoppedOnStep,
        ]
    );
}

#[test]
fn test_transaction_setup_failure_is_fatal() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().entry("a.fc", 1, "f").build();
    let emulator = ScriptedEmulator::transaction(
        program.steps.clone(),
        0,
        EmulationResult::Transaction(TransactionResult::default()),
    );

    let prepared = DebugSession::prepare(
        emulator,
        program.code_root.clone(),
        &program.debug_info,
        Path::new(SOURCE_ROOT),
    );
    assert!(prepared.is_err());
}

#[test]
fn test_transaction_session_delivers_transaction_result() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let result = EmulationResult::Transaction(TransactionResult {
        aborted: false,
        exit_code: Some(0),
        transaction: "te6cc".to_string(),
    });
    let program = TraceBuilder::new().entry("a.fc", 1, "f").build();
    let emulator = ScriptedEmulator::transaction(program.steps.clone(), 1, result.clone());
    let (mut session, mut handles) = prepare(&program, emulator);
    assert_eq!(session.kind(), SessionKind::Transaction);

    session.continue_running().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::End]);
    assert_eq!(handles.finished.try_recv().unwrap(), result);
}

#[test]
fn test_emulator_error_releases_handle() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().entry("a.fc", 1, "f").stmt("a.fc", 2, "f").build();
    let emulator = ScriptedEmulator::get_method(program.steps.clone()).failing_at(1);
    let (mut session, mut handles) = prepare(&program, emulator);

    session.step_in().unwrap();
    drain(&mut handles.events);

    // The second step fails inside the emulator; the handle must be gone.
    assert!(session.step_in().is_err());
    assert!(!session.is_running());
    assert!(session.step_in().is_err());
    assert!(handles.finished.try_recv().is_err());
}

#[test]
fn test_step_over_without_call_behaves_like_step() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    let program = TraceBuilder::new().entry("a.fc", 1, "f").stmt("a.fc", 2, "f").build();
    let (mut session, mut handles) = prepare_get_method(&program);

    session.step_in().unwrap();
    drain(&mut handles.events);

    session.step_over().unwrap();
    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnStep]);
    assert_eq!(session.current_location().unwrap().line, 2);
    assert_eq!(session.frames().len(), 1);
}

#[test]
fn test_nested_calls_keep_outer_lines() {
    tdb_common::logging::ensure_test_logging(None);
    info!("Running test");

    // f calls g; while g runs, f's frame must keep showing the call line.
    let program = TraceBuilder::new()
        .entry("a.fc", 10, "f")
        .stmt("a.fc", 11, "f")
        .entry("b.fc", 20, "g")
        .stmt("b.fc", 21, "g")
        .ret("b.fc", 22, "g")
        .stmt("a.fc", 12, "f")
        .build();
    let (mut session, mut handles) = prepare_get_method(&program);
    session.set_breakpoint(&src("b.fc"), 21);

    session.continue_running().unwrap();

    assert_eq!(drain(&mut handles.events), vec![DebugEvent::StoppedOnBreakpoint]);
    let frames = session.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!((frames[0].function.as_str(), frames[0].line), ("f", 11));
    assert_eq!((frames[1].function.as_str(), frames[1].line), ("g", 21));
    assert_eq!(frames[1].path, src("b.fc"));
}
