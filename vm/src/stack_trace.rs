use itertools::Itertools;
use log::warn;

use rbvm_code::{code_error::CodeError, code_space::CodeSpace};

use crate::{
    frame::Frame, stack::Stack, stack_trace_element::StackTraceElement, vm_error::VmError,
};

/// Builds the stack trace of a parked stack, innermost call first
pub fn stack_trace<'c>(
    stack: &Stack,
    code: &'c CodeSpace,
) -> Result<Vec<StackTraceElement<'c>>, VmError> {
    let mut frame = Frame::new(stack);
    let mut elements = Vec::new();
    while frame.move_to_caller() {
        let resume_address = frame.resume_address();
        let function = frame.owning_function(code)?.function;
        if function.is_leaf() && !elements.is_empty() {
            warn!(
                "leaf function {} found below the top of the stack, at frame {}",
                function,
                frame.frame_pointer()
            );
        }

        let offset = function
            .offset_of(resume_address)
            .ok_or(CodeError::AddressNotInFunction(resume_address))?;
        elements.push(StackTraceElement {
            function_name: &function.name,
            function_id: function.id,
            offset,
        });
    }
    Ok(elements)
}

pub fn format_stack_trace(elements: &[StackTraceElement]) -> String {
    elements.iter().map(|element| format!("  at {element}")).join("\n")
}
