use int_enum::IntEnum;

/// The byte code operations. Every operation has a fixed number of operand bytes,
/// which is what allows a linear scan to step from one instruction to the next.
#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    IntEnum,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
pub enum OpCode {
    LoadLocal = 0x01,
    StoreLocal = 0x02,
    LoadConst = 0x03,
    LoadNull = 0x04,
    Pop = 0x05,
    Add = 0x06,
    InvokeStatic = 0x10,
    Return = 0x11,
    Branch = 0x20,
    BranchIfTrue = 0x21,
    Throw = 0x30,

    /// Terminates the code of every function. The operand is the distance in bytes
    /// from the first instruction of the function to this one.
    MethodEnd = 0xFF,
}

impl OpCode {
    pub fn operand_length(&self) -> usize {
        match self {
            OpCode::LoadNull | OpCode::Pop | OpCode::Add | OpCode::Throw => 0,
            OpCode::LoadLocal | OpCode::StoreLocal | OpCode::Return => 1,
            OpCode::LoadConst
            | OpCode::InvokeStatic
            | OpCode::Branch
            | OpCode::BranchIfTrue
            | OpCode::MethodEnd => 4,
        }
    }

    /// Total size of the instruction, op code byte included
    pub fn instruction_size(&self) -> usize {
        1 + self.operand_length()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use crate::opcodes::OpCode;

    #[test]
    fn every_op_code_round_trips_through_its_byte() {
        for op_code in OpCode::iter() {
            let byte = op_code as u8;
            assert_eq!(Ok(op_code), OpCode::try_from(byte).map_err(|_| byte));
        }
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        assert!(OpCode::try_from(0x00u8).is_err());
        assert!(OpCode::try_from(0x7Fu8).is_err());
    }

    #[test]
    fn sizes_include_the_op_code_byte() {
        assert_eq!(1, OpCode::Pop.instruction_size());
        assert_eq!(2, OpCode::LoadLocal.instruction_size());
        assert_eq!(5, OpCode::MethodEnd.instruction_size());
    }

    #[test]
    fn displays_the_op_code_name() {
        assert_eq!("InvokeStatic", format!("{}", OpCode::InvokeStatic));
    }
}
