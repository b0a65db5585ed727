pub trait ToUsizeSafe {
    fn into_usize_safe(self) -> usize;
}

impl ToUsizeSafe for u32 {
    fn into_usize_safe(self) -> usize {
        usize::try_from(self).expect("usize should have at least 32 bits")
    }
}

/// Narrowing conversion used when encoding code-space offsets, which are 32 bits wide
pub trait ToU32Checked {
    fn into_u32_checked(self) -> Option<u32>;
}

impl ToU32Checked for usize {
    fn into_u32_checked(self) -> Option<u32> {
        u32::try_from(self).ok()
    }
}
