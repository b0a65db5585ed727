#[macro_use]
extern crate bitflags;

pub mod code_address;
pub mod code_error;
pub mod code_space;
pub mod code_space_builder;
pub mod function;
pub mod function_flags;
pub mod instruction;
pub mod opcodes;
