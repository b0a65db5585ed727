use thiserror::Error;

use rbvm_utils::buffer::BufferError;

use crate::{code_address::CodeAddress, opcodes::OpCode};

/// Errors raised while decoding or assembling a code space. When returned by the
/// function lookup they mean the code is corrupted or the address was not an
/// instruction address, and the caller must not carry on with the operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeError {
    #[error("address {0} is outside of the code space")]
    AddressOutOfRange(CodeAddress),

    #[error("no method end found after address {0}")]
    MissingMethodEnd(CodeAddress),

    #[error("address {0} points to a method end marker, not to an instruction")]
    AddressAtMethodEnd(CodeAddress),

    #[error("address {0} is not inside the function terminated by the next method end")]
    AddressNotInFunction(CodeAddress),

    #[error("invalid op code {byte:#04x} at offset {offset}")]
    InvalidOpCode { offset: usize, byte: u8 },

    #[error("instruction {op_code} at offset {offset} is truncated")]
    TruncatedInstruction { op_code: OpCode, offset: usize },

    #[error("invalid function header before method end at offset {0}")]
    InvalidFunctionHeader(usize),

    #[error("instruction {op_code} expects {expected} operand bytes, got {actual}")]
    InvalidOperands {
        op_code: OpCode,
        expected: usize,
        actual: usize,
    },

    #[error("op code {0} is reserved and cannot be emitted directly")]
    ReservedOpCode(OpCode),

    #[error("invalid frame ranges for function starting at {0}")]
    InvalidFrameRanges(CodeAddress),

    #[error("code space exceeds the addressable size")]
    CodeSpaceTooLarge,

    #[error("unexpected end of code")]
    UnexpectedEndOfCode,
}

impl From<BufferError> for CodeError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::UnexpectedEndOfData => CodeError::UnexpectedEndOfCode,
        }
    }
}

pub type Result<T> = std::result::Result<T, CodeError>;
