pub mod frame;
pub mod gc;
pub mod slot;
pub mod stack;
pub mod stack_trace;
pub mod stack_trace_element;
pub mod unwind;
pub mod vm_error;
