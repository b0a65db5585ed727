use thiserror::Error;

use rbvm_code::code_error::CodeError;

use crate::stack::StackError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VmError {
    #[error("corrupted code: {0}")]
    CodeError(CodeError),

    #[error("stack error: {0}")]
    StackError(StackError),
}

impl From<CodeError> for VmError {
    fn from(value: CodeError) -> Self {
        Self::CodeError(value)
    }
}

impl From<StackError> for VmError {
    fn from(value: StackError) -> Self {
        Self::StackError(value)
    }
}
