//! Shared fixtures for position integration tests
//!
//! Builds a small program whose call graph is
//!
//! ```text
//! App.main ──invoke_static──▶ App.helper ──invoke_virtual──▶ Shape.area
//! ```
//!
//! with real method bodies registered in a `MethodRegistry`, plus an
//! `unrelated` method that nothing calls.

#![allow(dead_code)]

use inline_provenance::bytecode::{ChunkBuilder, MethodRegistry, Opcode};
use inline_provenance::meta::{MethodRef, Signature, TypeRef};

pub struct Program {
    pub registry: MethodRegistry,
    pub app: TypeRef,
    pub shape: TypeRef,
    pub main: MethodRef,
    pub helper: MethodRef,
    pub area: MethodRef,
    pub unrelated: MethodRef,
    /// bci of the `helper` call in `main`
    pub main_calls_helper: i32,
    /// bci of the `area` call in `helper`
    pub helper_calls_area: i32,
}

pub fn program() -> Program {
    let object = TypeRef::new("Ljava/lang/Object;");
    let app = TypeRef::with_supertypes("Lapp/App;", vec![object.clone()]);
    let shape = TypeRef::with_supertypes("Lapp/Shape;", vec![object]);

    let main = MethodRef::new(app.clone(), "main", Signature::new("()V"));
    let helper = MethodRef::new(app.clone(), "helper", Signature::new("(Lapp/Shape;)I"));
    let area = MethodRef::new(shape.clone(), "area", Signature::new("()I"));
    let unrelated = MethodRef::new(app.clone(), "unrelated", Signature::new("(J)V"));

    let registry = MethodRegistry::new();

    let mut builder = ChunkBuilder::new("main");
    builder.emit(Opcode::PushNull);
    let main_calls_helper = builder
        .emit_invoke(Opcode::InvokeStatic, helper.clone())
        .expect("helper call");
    builder.emit(Opcode::Pop);
    builder.emit(Opcode::Return);
    registry.register(main.clone(), builder.build_arc());

    let mut builder = ChunkBuilder::new("helper");
    builder.emit_byte(Opcode::LoadLocal, 0);
    let helper_calls_area = builder
        .emit_invoke(Opcode::InvokeVirtual, area.clone())
        .expect("area call");
    builder.emit(Opcode::ReturnValue);
    registry.register(helper.clone(), builder.build_arc());

    let mut builder = ChunkBuilder::new("area");
    builder.emit_byte(Opcode::PushIntSmall, 42);
    builder.emit(Opcode::ReturnValue);
    registry.register(area.clone(), builder.build_arc());

    Program {
        registry,
        app,
        shape,
        main,
        helper,
        area,
        unrelated,
        main_calls_helper: main_calls_helper as i32,
        helper_calls_area: helper_calls_area as i32,
    }
}

/// Install a test-writer subscriber so `tracing` output shows up with `--nocapture`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
