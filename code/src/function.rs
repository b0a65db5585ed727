use std::{
    fmt,
    fmt::{Display, Formatter},
};

use crate::{
    code_address::{CodeAddress, FunctionId},
    function_flags::FunctionFlags,
};

/// A compiled function. Its code lives in the code space at `[start, end)`, where
/// `end` is the address of the terminating `MethodEnd` instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    pub arity: u8,
    pub num_locals: u8,
    pub flags: FunctionFlags,
    pub start: CodeAddress,
    pub end: CodeAddress,
}

impl Function {
    /// True for the addresses of the function's own instructions; the method end
    /// marker is excluded.
    pub fn contains(&self, address: CodeAddress) -> bool {
        self.start <= address && address < self.end
    }

    /// Offset of the given address from the first instruction of the function
    pub fn offset_of(&self, address: CodeAddress) -> Option<u32> {
        if self.contains(address) {
            Some(address.0 - self.start.0)
        } else {
            None
        }
    }

    pub fn code_length(&self) -> u32 {
        self.end.0 - self.start.0
    }

    pub fn is_leaf(&self) -> bool {
        self.flags.contains(FunctionFlags::LEAF)
    }

    pub fn has_frame_ranges(&self) -> bool {
        self.flags.contains(FunctionFlags::HAS_FRAME_RANGES)
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} [{}..{})", self.name, self.id, self.start, self.end)
    }
}

/// A protected region of a function's code: if an exception is thrown while the
/// function is suspended at an address in `[start, end)`, execution resumes at `handler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CatchRange {
    pub start: CodeAddress,
    pub end: CodeAddress,
    pub handler: CodeAddress,
}

impl CatchRange {
    pub fn contains(&self, address: CodeAddress) -> bool {
        self.start <= address && address < self.end
    }
}
