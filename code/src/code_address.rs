use std::{
    fmt,
    fmt::{Display, Formatter},
};

use rbvm_utils::type_conversion::ToUsizeSafe;

/// Models the address of an instruction, i.e. its byte offset inside a code space.
/// This is what a frame stores as its resume address.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct CodeAddress(pub u32);

impl CodeAddress {
    pub fn index(self) -> usize {
        self.0.into_usize_safe()
    }

    /// Returns the address `delta` bytes after this one, or `None` on overflow
    pub fn checked_add(self, delta: u32) -> Option<CodeAddress> {
        self.0.checked_add(delta).map(CodeAddress)
    }
}

impl Display for CodeAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Index of a function inside its code space
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub u32);

impl Display for FunctionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::code_address::{CodeAddress, FunctionId};

    #[test]
    fn can_format_addresses_and_ids() {
        assert_eq!("0x002a", format!("{}", CodeAddress(42)));
        assert_eq!("#3", format!("{}", FunctionId(3)));
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(Some(CodeAddress(12)), CodeAddress(10).checked_add(2));
        assert_eq!(None, CodeAddress(u32::MAX).checked_add(1));
    }
}
