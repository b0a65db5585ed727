use rbvm_code::{
    code_address::{CodeAddress, FunctionId},
    code_space::CodeSpace,
    code_space_builder::CodeSpaceBuilder,
    opcodes::OpCode,
};
use rbvm_vm::{
    slot::{ObjectRef, Slot},
    stack::{SlotPointer, Stack},
};

/// Three nested calls a -> b -> c, each with one argument and two locals, with the
/// stack parked while c is throwing
pub struct NestedCalls {
    pub code: CodeSpace,
    pub stack: Stack,
    pub a: FunctionId,
    pub b: FunctionId,
    pub c: FunctionId,
    pub call_site_in_a: CodeAddress,
    pub call_site_in_b: CodeAddress,
    pub throw_in_c: CodeAddress,
    pub handler_in_b: Option<CodeAddress>,
    pub frame_pointers: Vec<SlotPointer>,
}

pub fn nested_calls(with_handler_in_b: bool) -> NestedCalls {
    let mut builder = CodeSpaceBuilder::new();

    let mut c = builder.begin_function("c", 1, 2).unwrap();
    c.emit(OpCode::LoadLocal, &[0]).unwrap();
    c.emit_u32(OpCode::LoadConst, 0xFF00_0000).unwrap();
    let throw_in_c = c.emit(OpCode::Throw, &[]).unwrap();
    c.emit(OpCode::Return, &[1]).unwrap();
    let c = c.finish().unwrap();

    let mut b = builder.begin_function("b", 1, 2).unwrap();
    b.emit(OpCode::LoadLocal, &[0]).unwrap();
    b.emit(OpCode::LoadNull, &[]).unwrap();
    b.emit(OpCode::Pop, &[]).unwrap();
    let call_site_in_b = b.invoke_static(c).unwrap();
    let after_call = b.emit(OpCode::Return, &[1]).unwrap();
    let handler_in_b = if with_handler_in_b {
        let handler = b.emit(OpCode::Pop, &[]).unwrap();
        b.emit(OpCode::Return, &[1]).unwrap();
        b.add_catch_range(call_site_in_b, after_call, handler);
        Some(handler)
    } else {
        None
    };
    let b = b.finish().unwrap();

    let mut a = builder.begin_function("a", 1, 2).unwrap();
    a.emit(OpCode::LoadNull, &[]).unwrap();
    let call_site_in_a = a.invoke_static(b).unwrap();
    a.emit(OpCode::Return, &[1]).unwrap();
    let a = a.finish().unwrap();

    let code = builder.build();

    let mut stack = Stack::new();
    let mut frame_pointers = Vec::new();
    stack.push(Slot::Object(ObjectRef(0))).unwrap();
    frame_pointers.push(stack.push_entry_frame().unwrap());
    stack.push(Slot::Object(ObjectRef(1))).unwrap();
    stack.push(Slot::Object(ObjectRef(2))).unwrap();

    stack.push(Slot::Int(1)).unwrap();
    frame_pointers.push(stack.push_frame(call_site_in_a).unwrap());
    stack.push(Slot::Object(ObjectRef(3))).unwrap();
    stack.push(Slot::Object(ObjectRef(4))).unwrap();

    stack.push(Slot::Int(2)).unwrap();
    frame_pointers.push(stack.push_frame(call_site_in_b).unwrap());
    stack.push(Slot::Object(ObjectRef(5))).unwrap();
    stack.push(Slot::Int(6)).unwrap();

    stack.park(throw_in_c).unwrap();

    NestedCalls {
        code,
        stack,
        a,
        b,
        c,
        call_site_in_a,
        call_site_in_b,
        throw_in_c,
        handler_in_b,
        frame_pointers,
    }
}
