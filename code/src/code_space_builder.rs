use itertools::Itertools;
use log::debug;

use rbvm_utils::type_conversion::ToU32Checked;

use crate::{
    code_address::{CodeAddress, FunctionId},
    code_error::{CodeError, Result},
    code_space::{CodeSpace, FRAME_RANGE_SIZE, FUNCTION_HEADER_SIZE},
    function::{CatchRange, Function},
    function_flags::FunctionFlags,
    opcodes::OpCode,
};

/// Assembles functions into a [CodeSpace], laying them out with their headers,
/// method end markers and frame ranges.
#[derive(Debug, Default)]
pub struct CodeSpaceBuilder {
    bytes: Vec<u8>,
    functions: Vec<Function>,
}

impl CodeSpaceBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Starts a new function; the returned assembler must be finished before the
    /// next function can be started.
    pub fn begin_function(
        &mut self,
        name: &str,
        arity: u8,
        num_locals: u8,
    ) -> Result<FunctionAssembler<'_>> {
        let id = self
            .functions
            .len()
            .into_u32_checked()
            .ok_or(CodeError::CodeSpaceTooLarge)?;
        self.bytes.extend_from_slice(&id.to_be_bytes());
        let start = address_of(self.bytes.len())?;

        Ok(FunctionAssembler {
            builder: self,
            id: FunctionId(id),
            name: name.to_string(),
            arity,
            num_locals,
            start,
            catch_ranges: Vec::new(),
            leaf: true,
        })
    }

    pub fn build(self) -> CodeSpace {
        CodeSpace::new(self.bytes, self.functions)
    }
}

fn address_of(position: usize) -> Result<CodeAddress> {
    position
        .into_u32_checked()
        .map(CodeAddress)
        .ok_or(CodeError::CodeSpaceTooLarge)
}

/// Emits the code of one function
pub struct FunctionAssembler<'b> {
    builder: &'b mut CodeSpaceBuilder,
    id: FunctionId,
    name: String,
    arity: u8,
    num_locals: u8,
    start: CodeAddress,
    catch_ranges: Vec<CatchRange>,
    leaf: bool,
}

impl<'b> FunctionAssembler<'b> {
    pub fn id(&self) -> FunctionId {
        self.id
    }

    /// Address at which the next instruction will be emitted
    pub fn position(&self) -> CodeAddress {
        CodeAddress(self.start.0 + self.code_length())
    }

    fn code_length(&self) -> u32 {
        // bounded by emit, which rejects anything not addressable with 32 bits
        (self.builder.bytes.len() - self.start.index()) as u32
    }

    /// Appends an instruction and returns its address
    pub fn emit(&mut self, op_code: OpCode, operands: &[u8]) -> Result<CodeAddress> {
        if op_code == OpCode::MethodEnd {
            return Err(CodeError::ReservedOpCode(op_code));
        }
        if operands.len() != op_code.operand_length() {
            return Err(CodeError::InvalidOperands {
                op_code,
                expected: op_code.operand_length(),
                actual: operands.len(),
            });
        }

        let address = self.position();
        // Leave room for the method end and an empty frame ranges table
        address_of(
            self.builder.bytes.len()
                + op_code.instruction_size()
                + OpCode::MethodEnd.instruction_size()
                + 4,
        )?;

        if op_code == OpCode::InvokeStatic {
            self.leaf = false;
        }
        self.builder.bytes.push(op_code as u8);
        self.builder.bytes.extend_from_slice(operands);
        Ok(address)
    }

    pub fn emit_u32(&mut self, op_code: OpCode, operand: u32) -> Result<CodeAddress> {
        self.emit(op_code, &operand.to_be_bytes())
    }

    pub fn invoke_static(&mut self, callee: FunctionId) -> Result<CodeAddress> {
        self.emit_u32(OpCode::InvokeStatic, callee.0)
    }

    /// Protects `[start, end)`: exceptions thrown there resume at `handler`
    pub fn add_catch_range(&mut self, start: CodeAddress, end: CodeAddress, handler: CodeAddress) {
        self.catch_ranges.push(CatchRange {
            start,
            end,
            handler,
        });
    }

    /// Writes the method end marker and the frame ranges, and registers the function.
    /// On error the function's header and code are removed again.
    pub fn finish(self) -> Result<FunctionId> {
        let end = self.position();
        let function = Function {
            id: self.id,
            name: self.name,
            arity: self.arity,
            num_locals: self.num_locals,
            flags: Self::flags(self.leaf, &self.catch_ranges),
            start: self.start,
            end,
        };
        let ranges = self
            .catch_ranges
            .into_iter()
            .sorted()
            .collect::<Vec<CatchRange>>();

        let builder = self.builder;
        match Self::write_trailer(&mut builder.bytes, &function, &ranges) {
            Ok(()) => {
                debug!(
                    "assembled function {} with {} catch ranges",
                    function,
                    ranges.len()
                );
                let id = function.id;
                builder.functions.push(function);
                Ok(id)
            }
            Err(err) => {
                builder
                    .bytes
                    .truncate(function.start.index() - FUNCTION_HEADER_SIZE);
                Err(err)
            }
        }
    }

    fn write_trailer(bytes: &mut Vec<u8>, function: &Function, ranges: &[CatchRange]) -> Result<()> {
        if ranges.iter().any(|range| {
            range.start > range.end || range.end > function.end || !function.contains(range.handler)
        }) {
            return Err(CodeError::InvalidFrameRanges(function.start));
        }
        let count = ranges
            .len()
            .into_u32_checked()
            .ok_or(CodeError::CodeSpaceTooLarge)?;
        address_of(
            bytes.len()
                + OpCode::MethodEnd.instruction_size()
                + 4
                + ranges.len().saturating_mul(FRAME_RANGE_SIZE),
        )?;

        bytes.push(OpCode::MethodEnd as u8);
        bytes.extend_from_slice(&function.code_length().to_be_bytes());
        bytes.extend_from_slice(&count.to_be_bytes());
        for range in ranges {
            for address in [range.start, range.end, range.handler] {
                bytes.extend_from_slice(&(address.0 - function.start.0).to_be_bytes());
            }
        }
        Ok(())
    }

    fn flags(leaf: bool, catch_ranges: &[CatchRange]) -> FunctionFlags {
        let mut flags = FunctionFlags::empty();
        if leaf {
            flags |= FunctionFlags::LEAF;
        }
        if !catch_ranges.is_empty() {
            flags |= FunctionFlags::HAS_FRAME_RANGES;
        }
        flags
    }
}
