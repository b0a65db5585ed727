use log::debug;
use result::prelude::*;

use rbvm_code::{
    code_address::{CodeAddress, FunctionId},
    code_space::CodeSpace,
};

use crate::{
    frame::Frame,
    stack::{SlotPointer, Stack, StackError},
    vm_error::VmError,
};

/// The frame that will handle an exception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnwindTarget {
    pub frame_pointer: SlotPointer,
    pub function_id: FunctionId,
    pub handler: CodeAddress,
    /// Number of frames above the handling one, which will be discarded
    pub depth: usize,
}

/// Searches a parked stack for a handler of an exception thrown at the parked address.
/// Frames are visited innermost first; the first one suspended inside one of its catch
/// ranges gets its resume address redirected to the range's handler.
pub fn unwind(stack: &mut Stack, code: &CodeSpace) -> Result<Option<UnwindTarget>, VmError> {
    let mut frame = Frame::new(stack);
    let mut depth = 0;
    while frame.move_to_caller() {
        let lookup = frame.owning_function(code)?;
        let function = lookup.function;
        let resume_address = frame.resume_address();

        let ranges = function
            .has_frame_ranges()
            .then(|| code.frame_ranges(&lookup))
            .invert()?
            .unwrap_or_default();
        if let Some(range) = ranges.iter().find(|range| range.contains(resume_address)) {
            debug!(
                "exception at {} in {} is handled at {}",
                resume_address, function, range.handler
            );
            frame.set_resume_address(range.handler);
            return Ok(Some(UnwindTarget {
                frame_pointer: frame.frame_pointer(),
                function_id: function.id,
                handler: range.handler,
                depth,
            }));
        }

        debug!("no handler in {} for address {}", function, resume_address);
        depth += 1;
    }
    Ok(None)
}

/// Unparks the stack and discards the frames above the target, returning the address
/// at which execution continues in the handling frame. Fails, leaving the stack
/// untouched, if the target frame is not part of the parked stack.
pub fn resume_at(stack: &mut Stack, target: &UnwindTarget) -> Result<CodeAddress, StackError> {
    if !stack.is_parked() {
        return Err(StackError::NotParked);
    }
    if !is_on_stack(stack, target.frame_pointer) {
        return Err(StackError::FrameNotOnStack(target.frame_pointer));
    }

    let mut address = stack.unpark()?;
    while stack.frame_pointer() != Some(target.frame_pointer) {
        address = stack.pop_frame()?.ok_or(StackError::NoActiveFrame)?;
    }
    Ok(address)
}

fn is_on_stack(stack: &Stack, frame_pointer: SlotPointer) -> bool {
    let mut frame = Frame::new(stack);
    while frame.move_to_caller() {
        if frame.frame_pointer() == frame_pointer {
            return true;
        }
    }
    false
}
