use crate::{
    Instruction, Label, Landmarks, LocalKind, LocalSlot, MethodRef, OpCode, Operand, PatchFailure,
    PatchSession, Patcher, Routine, SessionError, INJECTED_INSTRUCTIONS,
};
use deepstore_core::{NullSink, PatchPhase, RecordingSink};
use rand::Rng;

const LOOP_HEAD: Label = Label(1);
const KEEP_LOOKING: Label = Label(2);
const DONE: Label = Label(3);

fn v(n: u16) -> LocalSlot {
    LocalSlot(n)
}

/// Shape of the host's store cell search, reduced to the parts that matter.
fn search_body(with_comparison: bool) -> Vec<Instruction> {
    let mut body = vec![
        Instruction::ldc(i64::from(i32::MAX)),
        Instruction::stloc(v(0)),
        Instruction::ldarg(3),
        Instruction::stloc(v(1)),
        Instruction::ldc(-1),
        Instruction::stloc(v(2)),
        Instruction::ldarg(2).with_label(LOOP_HEAD),
        Instruction::new(OpCode::LdFld, Operand::Field("haulDestinationManager".into())),
        Instruction::new(
            OpCode::CallVirt,
            Operand::Method(MethodRef::new("SlotGroup", "get_Settings")),
        ),
        Instruction::stloc(v(6)),
        Instruction::ldloc(v(6)),
        Instruction::new(OpCode::LdFld, Operand::Field("Priority".into())),
        Instruction::stloc(v(7)),
        Instruction::ldloc(v(7)),
        Instruction::ldloc(v(1)),
        Instruction::branch(OpCode::Blt, DONE),
    ];
    if with_comparison {
        body.extend([
            Instruction::ldloc(v(7)),
            Instruction::ldarg(3),
            Instruction::branch(OpCode::Bgt, KEEP_LOOKING),
        ]);
    }
    body.extend([
        Instruction::branch(OpCode::Br, DONE),
        Instruction::ldloc(v(2)).with_label(KEEP_LOOKING),
        Instruction::ldc(1),
        Instruction::op(OpCode::Pop),
        Instruction::branch(OpCode::Br, LOOP_HEAD),
        Instruction::ldloc(v(2)).with_label(DONE),
        Instruction::op(OpCode::Ret),
    ]);
    body
}

fn search_routine(body: Vec<Instruction>) -> Routine {
    let mut locals = vec![LocalKind::Float32, LocalKind::Int32, LocalKind::Int32];
    locals.extend((3..8).map(|_| LocalKind::Object("SlotGroup".into())));
    Routine::new("StoreUtility::TryFindBestBetterStoreCellFor", locals, body)
}

fn is_subsequence(needle: &[Instruction], haystack: &[Instruction]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|n| rest.any(|h| h == n))
}

fn assert_labels_preserved(before: &Routine, after: &Routine) {
    for (label, idx) in before.labels() {
        let moved = after.resolve_label(label).expect("label still defined");
        assert_eq!(before.body[idx], after.body[moved], "label L{}", label.0);
    }
    assert!(after.dangling_targets().is_empty());
}

#[test]
fn full_patch_injects_call_and_flag_test() {
    let original = search_routine(search_body(true));
    let sink = RecordingSink::new();
    let outcome = Patcher::default().patch(original.clone(), &sink);
    let patched = &outcome.routine;
    let report = &outcome.report;

    assert!(report.is_complete(), "{:?}", report.failures);
    assert!(sink.entries().is_empty());
    assert_eq!(report.injected, INJECTED_INSTRUCTIONS);
    assert_eq!(patched.body.len(), original.body.len() + INJECTED_INSTRUCTIONS);

    let flag = v(8);
    assert_eq!(report.flag_local, Some(flag));
    assert_eq!(patched.locals.len(), original.locals.len() + 1);
    assert_eq!(patched.locals[8], LocalKind::Bool);

    assert_eq!(report.anchor_index, Some(3));
    assert_eq!(
        &patched.body[4..9],
        &[
            Instruction::ldarg(2),
            Instruction::ldarg(0),
            Instruction::ldloca(v(1)),
            Instruction::call(MethodRef::new("capacity_guards::CapacityGuard", "over_capacity")),
            Instruction::stloc(flag),
        ]
    );

    assert_eq!(report.comparison_index, Some(18));
    let bgt = patched
        .body
        .iter()
        .position(|i| i.opcode == OpCode::Bgt)
        .expect("comparison kept");
    assert_eq!(
        &patched.body[bgt + 1..bgt + 3],
        &[
            Instruction::ldloc(flag),
            Instruction::branch(OpCode::BrTrue, KEEP_LOOKING),
        ]
    );

    assert!(is_subsequence(&original.body, &patched.body));
    assert_labels_preserved(&original, patched);
}

#[test]
fn missing_comparison_reports_only_phase_three() {
    let original = search_routine(search_body(false));
    let sink = RecordingSink::new();
    let outcome = Patcher::default().patch(original.clone(), &sink);

    assert_eq!(
        outcome.report.failures,
        vec![PatchFailure::ComparisonNotFound {
            local: v(7),
            arg: 3
        }]
    );
    assert_eq!(sink.patch_failures(), vec![PatchPhase::Comparison]);

    // The guard call still went in, the tail is intact.
    assert_eq!(outcome.report.injected, 5);
    assert_eq!(outcome.routine.body.len(), original.body.len() + 5);
    assert!(is_subsequence(&original.body, &outcome.routine.body));
    assert_labels_preserved(&original, &outcome.routine);
}

#[test]
fn missing_anchor_leaves_body_untouched() {
    let body: Vec<Instruction> = search_body(true)
        .into_iter()
        .filter(|i| !i.is_stloc(v(1)))
        .collect();
    let original = search_routine(body);
    let sink = RecordingSink::new();
    let outcome = Patcher::default().patch(original.clone(), &sink);

    assert_eq!(outcome.routine, original);
    assert_eq!(outcome.report.flag_local, None);
    assert_eq!(
        sink.patch_failures(),
        vec![
            PatchPhase::Anchor,
            PatchPhase::SlotPriorityStore,
            PatchPhase::Comparison
        ]
    );
}

#[test]
fn missing_slot_priority_store_copies_everything() {
    let body: Vec<Instruction> = search_body(true)
        .into_iter()
        .filter(|i| !i.is_stloc(v(7)))
        .collect();
    let original = search_routine(body);
    let sink = RecordingSink::new();
    let outcome = Patcher::default().patch(original.clone(), &sink);

    assert_eq!(
        sink.patch_failures(),
        vec![PatchPhase::SlotPriorityStore, PatchPhase::Comparison]
    );
    assert_eq!(outcome.routine.body.len(), original.body.len() + 5);
    assert!(is_subsequence(&original.body, &outcome.routine.body));
}

#[test]
fn truncated_landmark_at_end_of_body_does_not_match() {
    let mut body = search_body(false);
    body.truncate(body.len() - 2);
    body.extend([Instruction::ldloc(v(7)), Instruction::ldarg(3)]);
    let original = search_routine(body);

    let outcome = Patcher::default().patch(original.clone(), &NullSink);
    assert_eq!(outcome.report.failures.len(), 1);
    assert_eq!(outcome.report.failures[0].phase(), PatchPhase::Comparison);
    assert_eq!(outcome.routine.body.len(), original.body.len() + 5);
}

#[test]
fn comparison_against_other_argument_is_ignored() {
    let body: Vec<Instruction> = search_body(true)
        .into_iter()
        .map(|i| {
            if i.opcode == OpCode::LdArg && i.operand == Operand::Arg(3) {
                Instruction::ldarg(4)
            } else {
                i
            }
        })
        .collect();
    let landmarks = Landmarks {
        current_priority_arg: 4,
        ..Landmarks::default()
    };
    let outcome = Patcher::new(landmarks).patch(search_routine(body.clone()), &NullSink);
    assert!(outcome.report.is_complete());

    let outcome = Patcher::default().patch(search_routine(body), &NullSink);
    assert_eq!(
        outcome
            .report
            .failures
            .iter()
            .map(PatchFailure::phase)
            .collect::<Vec<_>>(),
        vec![PatchPhase::Comparison]
    );
}

#[test]
fn noise_around_landmarks_is_copied_verbatim() {
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let mut body = search_body(true);
        for _ in 0..rng.gen_range(0..12) {
            let at = rng.gen_range(0..=body.len());
            // Never split the comparison landmark itself.
            let bgt = body
                .iter()
                .position(|i| i.opcode == OpCode::Bgt)
                .expect("landmark present");
            if at == bgt || at + 1 == bgt {
                continue;
            }
            let noise = match rng.gen_range(0..3) {
                0 => Instruction::op(OpCode::Nop),
                1 => Instruction::ldc(rng.gen_range(-10..10)),
                _ => Instruction::op(OpCode::Pop),
            };
            body.insert(at, noise);
        }
        let original = search_routine(body);
        let outcome = Patcher::default().patch(original.clone(), &NullSink);

        assert!(outcome.report.is_complete());
        assert_eq!(
            outcome.routine.body.len(),
            original.body.len() + INJECTED_INSTRUCTIONS
        );
        assert!(is_subsequence(&original.body, &outcome.routine.body));
        assert_labels_preserved(&original, &outcome.routine);
    }
}

#[test]
fn session_refuses_second_application() {
    let sink = RecordingSink::new();
    let mut session = PatchSession::new(Landmarks::default(), &sink);
    let routine = search_routine(search_body(true));
    let name = routine.name.clone();

    let patched = session.instrument(routine).expect("first run");
    assert!(session.is_patched(&name));
    assert_eq!(session.reports().len(), 1);

    assert_eq!(
        session.instrument(patched),
        Err(SessionError::AlreadyPatched(name))
    );
    assert_eq!(session.reports().len(), 1);
    assert!(sink.entries().is_empty());
}

#[test]
fn landmarks_load_with_defaults() {
    let landmarks = Landmarks::from_json(r#"{ "slot_priority_local": 9 }"#).expect("valid");
    assert_eq!(landmarks.slot_priority_local, v(9));
    assert_eq!(landmarks.priority_local, v(1));
    assert_eq!(landmarks.map_arg, 2);

    assert!(Landmarks::from_json(r#"{ "priority_local": 7 }"#).is_err());
}

#[test]
fn default_entry_point_is_the_capacity_guard() {
    let entry = Landmarks::default().entry_point;
    assert_eq!(entry.owner, deepstore_core::ENTRY_POINT_OWNER);
    assert_eq!(entry.name, deepstore_core::ENTRY_POINT_NAME);
    assert_eq!(entry.owner, capacity_guards::ENTRY_POINT_OWNER);
    assert_eq!(entry.name, capacity_guards::ENTRY_POINT_NAME);
}

#[test]
fn declare_local_stops_at_the_last_addressable_slot() {
    let mut routine = Routine::new("r", vec![LocalKind::Int32; usize::from(u16::MAX)], vec![]);
    assert_eq!(routine.declare_local(LocalKind::Bool), Some(v(u16::MAX)));
    assert_eq!(routine.declare_local(LocalKind::Bool), None);
    assert_eq!(routine.locals.len(), usize::from(u16::MAX) + 1);
}

#[test]
fn full_local_table_skips_injection() {
    let mut original = search_routine(search_body(true));
    original.locals.resize(usize::from(u16::MAX) + 1, LocalKind::Int32);
    let sink = RecordingSink::new();
    let outcome = Patcher::default().patch(original.clone(), &sink);

    assert_eq!(
        outcome.report.failures,
        vec![PatchFailure::FrameFull {
            locals: original.locals.len()
        }]
    );
    assert_eq!(sink.patch_failures(), vec![PatchPhase::Anchor]);
    assert_eq!(outcome.report.flag_local, None);
    assert_eq!(outcome.report.injected, 0);
    assert_eq!(outcome.routine, original);
}

#[test]
fn report_serializes_failures_by_name() {
    let outcome = Patcher::default().patch(search_routine(search_body(false)), &NullSink);
    let json = serde_json::to_value(&outcome.report).expect("report serializes");
    assert_eq!(json["injected"], 5);
    assert!(json["failures"][0].get("comparison_not_found").is_some());
}
