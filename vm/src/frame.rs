use std::{
    fmt,
    fmt::Formatter,
    ops::{Deref, DerefMut, RangeInclusive},
};

use rbvm_code::{
    code_address::CodeAddress,
    code_error::CodeError,
    code_space::{CodeSpace, FunctionLookup},
};

use crate::{
    slot::Slot,
    stack::{SlotPointer, Stack},
};

/// Where a [Frame] cursor is in its walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Just created on top of the stack; the frame size is not known yet
    Fresh,
    /// On a frame whose size has been computed
    Positioned,
    /// The last move found no caller. The cursor stays on the bottom-most frame.
    Bottom,
}

/// A frame is used to navigate a parked stack, frame by frame, from the innermost
/// call to the outermost one.
///
/// Frame sizes are not stored anywhere: they are recovered as the distance between
/// two consecutive frame pointers, which is why a fresh frame cannot tell its size
/// before the first [Frame::move_to_caller].
///
/// A frame borrows the stack, so the stack cannot grow or shrink while it is being
/// walked. Use `Frame<&Stack>` to read, `Frame<&mut Stack>` to also redirect resume
/// addresses.
pub struct Frame<S>
where
    S: Deref<Target = Stack>,
{
    stack: S,
    frame_pointer: SlotPointer,
    size: Option<usize>,
    state: FrameState,
}

impl<S> Frame<S>
where
    S: Deref<Target = Stack>,
{
    pub fn new(stack: S) -> Self {
        assert!(stack.is_parked(), "only a parked stack can be walked");
        let frame_pointer = stack.pointer(stack.top());
        Self {
            stack,
            frame_pointer,
            size: None,
            state: FrameState::Fresh,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Size in slots of the frame under the cursor, from its frame pointer up to the
    /// frame pointer of its callee
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Moves to the calling frame. Returns false, leaving the cursor where it is, once
    /// the bottom of the stack has been reached.
    pub fn move_to_caller(&mut self) -> bool {
        if self.state == FrameState::Bottom {
            return false;
        }
        match self.previous_frame_pointer() {
            None => {
                self.state = FrameState::Bottom;
                false
            }
            Some(previous) => {
                assert!(
                    previous < self.frame_pointer,
                    "caller frame {} is not below frame {}",
                    previous,
                    self.frame_pointer
                );
                self.size = Some(self.frame_pointer - previous);
                self.frame_pointer = previous;
                self.state = FrameState::Positioned;
                true
            }
        }
    }

    pub fn frame_pointer(&self) -> SlotPointer {
        self.frame_pointer
    }

    /// The caller's frame pointer, read without moving the cursor
    pub fn previous_frame_pointer(&self) -> Option<SlotPointer> {
        self.stack.get(self.frame_pointer).expect_frame_pointer()
    }

    fn known_size(&self) -> usize {
        self.size
            .expect("frame size is only known after moving to a caller")
    }

    fn resume_address_pointer(&self) -> SlotPointer {
        assert!(
            self.state == FrameState::Positioned,
            "resume address is not available in state {:?}",
            self.state
        );
        self.frame_pointer + self.known_size() - 1
    }

    /// Address at which this frame is suspended: the current instruction for the
    /// innermost frame, the invoke instruction for the others
    pub fn resume_address(&self) -> CodeAddress {
        self.stack.get(self.resume_address_pointer()).expect_code()
    }

    /// Address at which this frame's caller is suspended, or `None` for the entry frame
    pub fn return_address(&self) -> Option<CodeAddress> {
        assert!(
            self.state != FrameState::Fresh,
            "the top of a parked stack has no return address"
        );
        match self.stack.get(self.frame_pointer - 1) {
            Slot::Code(address) => Some(*address),
            Slot::Null => None,
            other => panic!(
                "invalid return address slot {:?} below frame {}",
                other, self.frame_pointer
            ),
        }
    }

    /// Finds the function that this frame is executing, by scanning its code from the
    /// resume address. Linear in the size of the function.
    pub fn owning_function<'c>(
        &self,
        code: &'c CodeSpace,
    ) -> Result<FunctionLookup<'c>, CodeError> {
        code.function_from_address(self.resume_address())
    }

    pub fn first_local_address(&self) -> SlotPointer {
        self.last_local_address() + 1 - self.num_locals()
    }

    pub fn last_local_address(&self) -> SlotPointer {
        self.frame_pointer + self.known_size() - 2
    }

    pub fn first_local_index(&self) -> usize {
        self.stack.index_of(self.first_local_address())
    }

    pub fn last_local_index(&self) -> usize {
        self.stack.index_of(self.last_local_address())
    }

    /// Indexes of the local slots, arguments pushed for the callee included. Empty if
    /// the frame has no locals.
    pub fn local_indexes(&self) -> RangeInclusive<usize> {
        self.first_local_index()..=self.last_local_index()
    }

    pub fn num_locals(&self) -> usize {
        self.known_size() - 3
    }
}

impl<S> Frame<S>
where
    S: DerefMut<Target = Stack>,
{
    /// Redirects where this frame will continue, e.g. to an exception handler
    pub fn set_resume_address(&mut self, address: CodeAddress) {
        let pointer = self.resume_address_pointer();
        self.stack.set(pointer, Slot::Code(address));
    }

    pub fn set_return_address(&mut self, address: CodeAddress) {
        let pointer = self.frame_pointer - 1;
        assert!(
            self.state != FrameState::Fresh && matches!(self.stack.get(pointer), Slot::Code(_)),
            "frame {} has no return address to replace",
            self.frame_pointer
        );
        self.stack.set(pointer, Slot::Code(address));
    }
}

impl<S> fmt::Debug for Frame<S>
where
    S: Deref<Target = Stack>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame{{frame_pointer={}, size={:?}, state={:?}}}",
            self.frame_pointer, self.size, self.state
        )
    }
}
