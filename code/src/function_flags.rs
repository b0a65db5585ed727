bitflags! {
    /// Properties of a compiled function, computed by the assembler
    pub struct FunctionFlags: u8 {
        /// The function's code is followed by a non-empty table of catch ranges
        const HAS_FRAME_RANGES = 0x01;
        /// The function never calls another function
        const LEAF = 0x02;
    }
}

impl Default for FunctionFlags {
    fn default() -> FunctionFlags {
        FunctionFlags::empty()
    }
}
