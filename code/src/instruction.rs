use std::fmt;
use std::fmt::Formatter;

use rbvm_utils::buffer::Buffer;

use crate::code_error::{CodeError, Result};
use crate::opcodes::OpCode;

#[derive(Debug, PartialEq)]
pub struct Instruction<'a> {
    pub op_code: OpCode,
    pub arguments: &'a [u8],
}

impl<'a> fmt::Display for Instruction<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.arguments.is_empty() {
            write!(f, "{}", self.op_code)
        } else {
            write!(f, "{} {:?}", self.op_code, self.arguments)
        }
    }
}

impl<'a> Instruction<'a> {
    pub fn parse_instruction(raw_code: &'a [u8], index: usize) -> Result<Self> {
        let op_byte = *raw_code
            .get(index)
            .ok_or(CodeError::UnexpectedEndOfCode)?;
        let op_code = OpCode::try_from(op_byte).map_err(|_| CodeError::InvalidOpCode {
            offset: index,
            byte: op_byte,
        })?;

        let arguments_len = op_code.operand_length();
        if index + 1 + arguments_len > raw_code.len() {
            return Err(CodeError::TruncatedInstruction {
                op_code,
                offset: index,
            });
        }
        let arguments = &raw_code[index + 1..index + 1 + arguments_len];

        Ok(Self { op_code, arguments })
    }

    pub fn argument_u32(&self, index: usize) -> Result<u32> {
        let mut buffer = Buffer::at(self.arguments, index)?;
        Ok(buffer.read_u32()?)
    }

    pub fn length(&self) -> usize {
        1 + self.arguments.len()
    }
}
