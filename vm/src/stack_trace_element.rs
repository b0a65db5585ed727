use std::{
    fmt,
    fmt::{Display, Formatter},
};

use rbvm_code::code_address::FunctionId;

/// One element of a stack trace: a function and the offset at which it is suspended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTraceElement<'a> {
    pub function_name: &'a str,
    pub function_id: FunctionId,
    pub offset: u32,
}

impl<'a> Display for StackTraceElement<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.function_name.is_empty() {
            write!(f, "<anonymous{}> (@{})", self.function_id, self.offset)
        } else {
            write!(f, "{} (@{})", self.function_name, self.offset)
        }
    }
}
