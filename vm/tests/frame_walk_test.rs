mod utils;

use rbvm_code::code_address::CodeAddress;
use rbvm_vm::{
    frame::{Frame, FrameState},
    gc::{root_ranges, visit_roots},
    slot::ObjectRef,
    stack_trace::{format_stack_trace, stack_trace},
};

use utils::nested_calls;

#[test_log::test]
fn walks_nested_calls_from_innermost_to_outermost() {
    let calls = nested_calls(false);
    let mut frame = Frame::new(&calls.stack);

    let expected = [
        (calls.c, calls.throw_in_c, 2),
        (calls.b, calls.call_site_in_b, 1),
        (calls.a, calls.call_site_in_a, 0),
    ];
    for (function_id, resume_address, frame_index) in expected {
        let previous_frame_pointer = frame.frame_pointer();
        assert!(frame.move_to_caller());

        let frame_pointer = calls.frame_pointers[frame_index];
        assert_eq!(frame_pointer, frame.frame_pointer());
        assert_eq!(Some(previous_frame_pointer - frame_pointer), frame.size());
        assert_eq!(resume_address, frame.resume_address());

        let lookup = frame
            .owning_function(&calls.code)
            .expect("should find the owning function");
        assert_eq!(function_id, lookup.function.id);
        assert!(frame.first_local_index() <= frame.last_local_index());
    }

    assert!(!frame.move_to_caller());
    assert_eq!(FrameState::Bottom, frame.state());
    assert_eq!(calls.frame_pointers[0], frame.frame_pointer());
    assert!(!frame.move_to_caller());
}

#[test_log::test]
fn exposes_locals_and_arguments_as_local_ranges() {
    let calls = nested_calls(false);
    let mut frame = Frame::new(&calls.stack);

    assert!(frame.move_to_caller());
    assert_eq!(16..=17, frame.local_indexes());
    assert_eq!(2, frame.num_locals());

    // b's range also covers the argument it pushed for c
    assert!(frame.move_to_caller());
    assert_eq!(10..=12, frame.local_indexes());
    assert_eq!(3, frame.num_locals());

    assert!(frame.move_to_caller());
    assert_eq!(4..=6, frame.local_indexes());
    assert_eq!(None, frame.return_address());
}

#[test_log::test]
fn previous_frame_pointer_does_not_move_the_cursor() {
    let calls = nested_calls(false);
    let mut frame = Frame::new(&calls.stack);
    frame.move_to_caller();

    let before = frame.frame_pointer();
    assert_eq!(Some(calls.frame_pointers[1]), frame.previous_frame_pointer());
    assert_eq!(Some(calls.frame_pointers[1]), frame.previous_frame_pointer());
    assert_eq!(before, frame.frame_pointer());
    assert_eq!(Some(calls.call_site_in_b), frame.return_address());
}

#[test_log::test]
fn resume_address_round_trips() {
    let mut calls = nested_calls(false);
    let mut frame = Frame::new(&mut calls.stack);
    frame.move_to_caller();
    frame.move_to_caller();

    frame.set_resume_address(CodeAddress(1234));
    assert_eq!(CodeAddress(1234), frame.resume_address());
    assert_eq!(CodeAddress(1234), frame.resume_address());
}

#[test_log::test]
fn builds_stack_traces() {
    let calls = nested_calls(false);
    let trace = stack_trace(&calls.stack, &calls.code).expect("should build stack trace");

    let offset = |function, address: CodeAddress| {
        address.0 - calls.code.function(function).unwrap().start.0
    };
    let names: Vec<&str> = trace.iter().map(|element| element.function_name).collect();
    assert_eq!(vec!["c", "b", "a"], names);
    assert_eq!(offset(calls.c, calls.throw_in_c), trace[0].offset);
    assert_eq!(offset(calls.b, calls.call_site_in_b), trace[1].offset);
    assert_eq!(offset(calls.a, calls.call_site_in_a), trace[2].offset);

    assert_eq!(
        "  at c (@7)\n  at b (@4)\n  at a (@1)",
        format_stack_trace(&trace)
    );
}

#[test_log::test]
fn scans_every_frame_for_roots() {
    let mut calls = nested_calls(false);
    assert_eq!(
        vec![16..=17, 10..=12, 4..=6, 0..=0],
        root_ranges(&calls.stack)
    );

    let mut seen = Vec::new();
    let visited = visit_roots(&mut calls.stack, |object| seen.push(*object));
    assert_eq!(6, visited);
    assert_eq!(
        vec![
            ObjectRef(5),
            ObjectRef(3),
            ObjectRef(4),
            ObjectRef(1),
            ObjectRef(2),
            ObjectRef(0)
        ],
        seen
    );
}
