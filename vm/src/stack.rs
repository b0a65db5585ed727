use std::{
    fmt,
    fmt::{Display, Formatter},
    ops::{Add, Sub},
};

use log::debug;
use thiserror::Error;

use rbvm_code::code_address::CodeAddress;

use crate::slot::Slot;

pub const DEFAULT_MAX_STACK_SIZE: usize = 64 * 1024;

/// Absolute position of a slot in a [Stack]. Arithmetic on pointers panics on
/// underflow; dereferencing goes through the stack, which checks the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotPointer(usize);

impl Add<usize> for SlotPointer {
    type Output = SlotPointer;

    fn add(self, rhs: usize) -> Self::Output {
        SlotPointer(
            self.0
                .checked_add(rhs)
                .expect("slot pointer arithmetic overflowed"),
        )
    }
}

impl Sub<usize> for SlotPointer {
    type Output = SlotPointer;

    fn sub(self, rhs: usize) -> Self::Output {
        SlotPointer(
            self.0
                .checked_sub(rhs)
                .expect("slot pointer moved below the bottom of the stack"),
        )
    }
}

/// Distance, in slots, between two pointers
impl Sub<SlotPointer> for SlotPointer {
    type Output = usize;

    fn sub(self, rhs: SlotPointer) -> Self::Output {
        self.0
            .checked_sub(rhs.0)
            .expect("slot pointer distance must not be negative")
    }
}

impl Display for SlotPointer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackError {
    #[error("stack overflow: maximum size is {0} slots")]
    Overflow(usize),

    #[error("stack underflow")]
    Underflow,

    #[error("no active frame")]
    NoActiveFrame,

    #[error("the stack is parked and cannot be modified")]
    Parked,

    #[error("the stack is not parked")]
    NotParked,

    #[error("frame {0} is not on the stack")]
    FrameNotOnStack(SlotPointer),
}

type Result<T> = std::result::Result<T, StackError>;

/// The execution stack of one process: a growable sequence of slots, plus the
/// interpreter's frame pointer register.
///
/// Call records are laid out as follows (higher addresses on top):
///
/// ```text
///   |    locals      |  <- frame pointer + 2 ...
///   |   (reserved)   |  <- frame pointer + 1
///   | frame pointer  |  <- frame pointer: the caller's frame pointer
///   | return address |  <- the address of the caller's invoke instruction
///   |   arguments    |
///   |   ... caller's record ...
/// ```
///
/// Before the stack is walked it must be parked: the current instruction address and
/// frame pointer are pushed, so that the top slot anchors the walk. Structural
/// changes are refused while parked.
#[derive(Debug)]
pub struct Stack {
    slots: Vec<Slot>,
    max_size: usize,
    frame_pointer: Option<SlotPointer>,
    parked: bool,
}

impl Default for Stack {
    fn default() -> Self {
        Self::with_max_size(DEFAULT_MAX_STACK_SIZE)
    }
}

impl Stack {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_size,
            frame_pointer: None,
            parked: false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn is_parked(&self) -> bool {
        self.parked
    }

    /// Index of the topmost slot
    pub fn top(&self) -> usize {
        self.slots
            .len()
            .checked_sub(1)
            .expect("an empty stack has no top")
    }

    /// Frame pointer of the frame currently executing, if any
    pub fn frame_pointer(&self) -> Option<SlotPointer> {
        self.frame_pointer
    }

    pub fn pointer(&self, index: usize) -> SlotPointer {
        self.check_bounds(index);
        SlotPointer(index)
    }

    pub fn index_of(&self, pointer: SlotPointer) -> usize {
        self.check_bounds(pointer.0);
        pointer.0
    }

    fn check_bounds(&self, index: usize) {
        assert!(
            index < self.slots.len(),
            "slot {} is outside of the stack [0, {})",
            index,
            self.slots.len()
        );
    }

    pub fn get(&self, pointer: SlotPointer) -> &Slot {
        &self.slots[self.index_of(pointer)]
    }

    pub fn get_mut(&mut self, pointer: SlotPointer) -> &mut Slot {
        let index = self.index_of(pointer);
        &mut self.slots[index]
    }

    pub fn set(&mut self, pointer: SlotPointer, slot: Slot) {
        *self.get_mut(pointer) = slot;
    }

    fn ensure_mutable(&self, additional: usize) -> Result<()> {
        if self.parked {
            Err(StackError::Parked)
        } else if self.slots.len() + additional > self.max_size {
            Err(StackError::Overflow(self.max_size))
        } else {
            Ok(())
        }
    }

    pub fn push(&mut self, slot: Slot) -> Result<()> {
        self.ensure_mutable(1)?;
        self.slots.push(slot);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Slot> {
        self.ensure_mutable(0)?;
        let floor = self.frame_pointer.map(|fp| fp.0 + 2).unwrap_or(0);
        if self.slots.len() <= floor {
            return Err(StackError::Underflow);
        }
        self.slots.pop().ok_or(StackError::Underflow)
    }

    /// Pushes the record of the first function executed on this stack, which has no caller
    pub fn push_entry_frame(&mut self) -> Result<SlotPointer> {
        self.ensure_mutable(3)?;
        self.push_record(Slot::Null, None)
    }

    /// Pushes the record of a called function. `return_address` is the address of the
    /// caller's invoke instruction; the caller's arguments must already be on the stack.
    pub fn push_frame(&mut self, return_address: CodeAddress) -> Result<SlotPointer> {
        self.ensure_mutable(3)?;
        let caller = self.frame_pointer.ok_or(StackError::NoActiveFrame)?;
        self.push_record(Slot::Code(return_address), Some(caller))
    }

    fn push_record(
        &mut self,
        return_slot: Slot,
        caller: Option<SlotPointer>,
    ) -> Result<SlotPointer> {
        self.slots.push(return_slot);
        let frame_pointer = SlotPointer(self.slots.len());
        self.slots.push(Slot::FramePointer(caller));
        self.slots.push(Slot::Null);
        self.frame_pointer = Some(frame_pointer);
        debug!("pushed frame at {}, caller frame at {:?}", frame_pointer, caller);
        Ok(frame_pointer)
    }

    /// Removes the current frame, including its return address slot, and returns the
    /// return address. The entry frame has none.
    pub fn pop_frame(&mut self) -> Result<Option<CodeAddress>> {
        self.ensure_mutable(0)?;
        let frame_pointer = self.frame_pointer.ok_or(StackError::NoActiveFrame)?;
        let caller = self.get(frame_pointer).expect_frame_pointer();
        let return_address = match self.get(frame_pointer - 1) {
            Slot::Code(address) => Some(*address),
            Slot::Null => None,
            other => panic!("invalid return address slot {other:?} below frame {frame_pointer}"),
        };

        self.slots.truncate(frame_pointer.0 - 1);
        self.frame_pointer = caller;
        debug!(
            "popped frame at {}, returning to {:?}",
            frame_pointer, return_address
        );
        Ok(return_address)
    }

    /// Saves the current instruction address and frame pointer on top of the stack,
    /// making it walkable by [crate::frame::Frame].
    pub fn park(&mut self, current_address: CodeAddress) -> Result<()> {
        self.ensure_mutable(2)?;
        let frame_pointer = self.frame_pointer.ok_or(StackError::NoActiveFrame)?;
        self.slots.push(Slot::Code(current_address));
        self.slots.push(Slot::FramePointer(Some(frame_pointer)));
        self.parked = true;
        Ok(())
    }

    /// Undoes [Stack::park], returning the address at which execution should continue.
    /// The address may have been rewritten while parked, e.g. to jump to a handler.
    pub fn unpark(&mut self) -> Result<CodeAddress> {
        if !self.parked {
            return Err(StackError::NotParked);
        }
        let top = self.pointer(self.top());
        self.frame_pointer = self.get(top).expect_frame_pointer();
        let address = self.get(top - 1).expect_code();
        self.slots.truncate(top.0 - 1);
        self.parked = false;
        Ok(address)
    }
}
