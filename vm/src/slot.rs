use rbvm_code::code_address::CodeAddress;

use crate::stack::SlotPointer;

/// Opaque handle of an object owned by the heap. The collector may rewrite it
/// in place while scanning roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub usize);

/// One stack slot. Which variant a slot may hold is decided by its position inside
/// an activation record: the frame code reads slots positionally and treats a
/// mismatch as a broken stack, so it panics rather than guessing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    #[default]
    Null,
    Int(i64),
    Object(ObjectRef),
    /// Resume address of a suspended frame
    Code(CodeAddress),
    /// Saved frame pointer of the caller; `None` marks the bottom-most frame
    FramePointer(Option<SlotPointer>),
}

impl Slot {
    pub fn as_object_mut(&mut self) -> Option<&mut ObjectRef> {
        match self {
            Slot::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn expect_code(&self) -> CodeAddress {
        match self {
            Slot::Code(address) => *address,
            other => panic!("expected a code address slot, found {other:?}"),
        }
    }

    pub fn expect_frame_pointer(&self) -> Option<SlotPointer> {
        match self {
            Slot::FramePointer(pointer) => *pointer,
            other => panic!("expected a frame pointer slot, found {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rbvm_code::code_address::CodeAddress;

    use crate::slot::{ObjectRef, Slot};

    #[test]
    fn can_rewrite_objects_in_place() {
        let mut slot = Slot::Object(ObjectRef(1));
        *slot.as_object_mut().unwrap() = ObjectRef(2);
        assert_eq!(Slot::Object(ObjectRef(2)), slot);
        assert_eq!(None, Slot::Int(3).as_object_mut());
    }

    #[test]
    fn can_read_positional_slots() {
        assert_eq!(CodeAddress(7), Slot::Code(CodeAddress(7)).expect_code());
        assert_eq!(None, Slot::FramePointer(None).expect_frame_pointer());
    }

    #[test]
    #[should_panic(expected = "expected a code address slot")]
    fn reading_a_reference_as_code_panics() {
        Slot::Object(ObjectRef(1)).expect_code();
    }

    #[test]
    #[should_panic(expected = "expected a frame pointer slot")]
    fn reading_code_as_frame_pointer_panics() {
        Slot::Code(CodeAddress(1)).expect_frame_pointer();
    }
}
