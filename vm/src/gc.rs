use std::ops::RangeInclusive;

use log::debug;

use crate::{
    frame::{Frame, FrameState},
    slot::ObjectRef,
    stack::Stack,
};

/// Ranges of slot indexes that may hold references, one per frame with locals, plus
/// the arguments passed to the entry frame. The stack must be parked.
pub fn root_ranges(stack: &Stack) -> Vec<RangeInclusive<usize>> {
    let mut frame = Frame::new(stack);
    let mut ranges = Vec::new();
    while frame.move_to_caller() {
        let locals = frame.local_indexes();
        if !locals.is_empty() {
            ranges.push(locals);
        }
    }

    // Anything below the entry frame's return address slot
    if frame.state() == FrameState::Bottom {
        let entry_return_slot = stack.index_of(frame.frame_pointer() - 1);
        if entry_return_slot > 0 {
            ranges.push(0..=entry_return_slot - 1);
        }
    }
    ranges
}

/// Calls the visitor on every reference held by the frames of a parked stack. The
/// visitor may rewrite the reference, e.g. when the object has been moved. Returns the
/// number of references visited.
pub fn visit_roots<F>(stack: &mut Stack, mut visitor: F) -> usize
where
    F: FnMut(&mut ObjectRef),
{
    let mut visited = 0;
    for range in root_ranges(stack) {
        for index in range {
            let pointer = stack.pointer(index);
            if let Some(object) = stack.get_mut(pointer).as_object_mut() {
                visitor(object);
                visited += 1;
            }
        }
    }
    debug!("visited {} roots", visited);
    visited
}
