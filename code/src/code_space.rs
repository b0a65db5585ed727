use std::{fmt, fmt::Formatter};

use log::debug;

use rbvm_utils::{buffer::Buffer, type_conversion::ToUsizeSafe};

use crate::{
    code_address::{CodeAddress, FunctionId},
    code_error::{CodeError, Result},
    function::{CatchRange, Function},
    instruction::Instruction,
    opcodes::OpCode,
};

/// Size of the header preceding the code of each function, holding its id
pub const FUNCTION_HEADER_SIZE: usize = 4;

/// Size of one encoded catch range: start, end and handler offsets
pub const FRAME_RANGE_SIZE: usize = 12;

/// The memory holding compiled code. Functions are laid out one after the other as
///
/// ```text
/// [function id: u32] [instructions...] [MethodEnd, u32 code length] [frame ranges]
/// ```
///
/// and there is no index from addresses to functions: the owner of an address is
/// found by scanning forward to the next `MethodEnd`.
pub struct CodeSpace {
    bytes: Vec<u8>,
    functions: Vec<Function>,
}

/// Result of resolving an instruction address to its function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionLookup<'a> {
    pub function: &'a Function,
    /// Byte offset of the frame ranges table following the function's method end
    pub frame_ranges_offset: usize,
}

impl CodeSpace {
    pub(crate) fn new(bytes: Vec<u8>, functions: Vec<Function>) -> Self {
        Self { bytes, functions }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.0.into_usize_safe())
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    pub fn instruction_at(&self, address: CodeAddress) -> Result<Instruction<'_>> {
        if address.index() >= self.bytes.len() {
            return Err(CodeError::AddressOutOfRange(address));
        }
        Instruction::parse_instruction(&self.bytes, address.index())
    }

    /// Finds the function whose code contains the given address, by searching through
    /// the code for the `MethodEnd` op code. This is linear in the size of the function,
    /// so it must stay off the interpreter's hot path.
    pub fn function_from_address(&self, address: CodeAddress) -> Result<FunctionLookup<'_>> {
        let first = self.instruction_at(address)?;
        if first.op_code == OpCode::MethodEnd {
            return Err(CodeError::AddressAtMethodEnd(address));
        }

        let mut position = address.index() + first.length();
        while position < self.bytes.len() {
            let instruction = Instruction::parse_instruction(&self.bytes, position)?;
            if instruction.op_code == OpCode::MethodEnd {
                return self.lookup_from_method_end(address, position, &instruction);
            }
            position += instruction.length();
        }
        Err(CodeError::MissingMethodEnd(address))
    }

    fn lookup_from_method_end(
        &self,
        address: CodeAddress,
        method_end: usize,
        instruction: &Instruction,
    ) -> Result<FunctionLookup<'_>> {
        let code_length = instruction.argument_u32(0)?.into_usize_safe();
        let start = method_end
            .checked_sub(code_length)
            .filter(|start| *start >= FUNCTION_HEADER_SIZE)
            .ok_or(CodeError::InvalidFunctionHeader(method_end))?;

        let id = Buffer::at(&self.bytes, start - FUNCTION_HEADER_SIZE)?.read_u32()?;
        let function = self
            .function(FunctionId(id))
            .filter(|function| {
                function.start.index() == start && function.end.index() == method_end
            })
            .ok_or(CodeError::InvalidFunctionHeader(method_end))?;

        if !function.contains(address) {
            return Err(CodeError::AddressNotInFunction(address));
        }

        debug!("resolved address {} to function {}", address, function);
        Ok(FunctionLookup {
            function,
            frame_ranges_offset: method_end + instruction.length(),
        })
    }

    /// Decodes the catch ranges stored after the function's method end
    pub fn frame_ranges(&self, lookup: &FunctionLookup) -> Result<Vec<CatchRange>> {
        let function = lookup.function;
        let invalid = || CodeError::InvalidFrameRanges(function.start);

        let mut buffer = Buffer::at(&self.bytes, lookup.frame_ranges_offset)?;
        let count = buffer.read_u32()?.into_usize_safe();
        if count
            .checked_mul(FRAME_RANGE_SIZE)
            .map_or(true, |size| size > buffer.remaining())
        {
            return Err(invalid());
        }

        let mut ranges = Vec::with_capacity(count);
        for _ in 0..count {
            let start = function
                .start
                .checked_add(buffer.read_u32()?)
                .ok_or_else(invalid)?;
            let end = function
                .start
                .checked_add(buffer.read_u32()?)
                .ok_or_else(invalid)?;
            let handler = function
                .start
                .checked_add(buffer.read_u32()?)
                .ok_or_else(invalid)?;

            if start > end || end > function.end || !function.contains(handler) {
                return Err(invalid());
            }
            ranges.push(CatchRange {
                start,
                end,
                handler,
            });
        }
        Ok(ranges)
    }
}

impl fmt::Debug for CodeSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CodeSpace{{size={}, functions={}}}",
            self.bytes.len(),
            self.functions.len()
        )
    }
}
