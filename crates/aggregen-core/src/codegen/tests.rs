use crate::{
    codegen::{CodeGen, CompareOp, ExecError, Instr},
    error::ErrorClass,
    storage::UpdateableStorage,
    types::SqlType,
    value::{Value, ValueError},
};

fn storage_with(types: &[SqlType]) -> UpdateableStorage {
    let mut storage = UpdateableStorage::new();
    for ty in types {
        storage.add_type(*ty).expect("fixed-size slot");
    }
    storage.finalize().expect("layout should finalize");

    storage
}

#[test]
fn params_bind_positionally_and_return_values() {
    let mut cg = CodeGen::new("sum2");
    let a = cg.param(0, SqlType::BigInt).expect("param 0");
    let b = cg.param(1, SqlType::BigInt).expect("param 1");
    let sum = cg.add(a, b).expect("add");
    cg.ret(&[sum]);
    let func = cg.finish().expect("function should seal");

    let out = func
        .invoke(&mut [], &[Value::big_int(2), Value::big_int(40)])
        .expect("invoke");

    assert_eq!(out, vec![Value::big_int(42)]);
    assert_eq!(func.param_types(), vec![SqlType::BigInt, SqlType::BigInt]);
}

#[test]
fn param_redeclared_with_other_type_is_rejected() {
    let mut cg = CodeGen::new("bad");
    cg.param(0, SqlType::Integer).expect("param");

    let err = cg
        .param(0, SqlType::BigInt)
        .expect_err("conflicting parameter type must fail");
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn undeclared_parameter_gap_fails_finish() {
    let mut cg = CodeGen::new("gap");
    cg.param(1, SqlType::Integer).expect("param");

    assert!(cg.finish().is_err());
}

#[test]
fn emit_time_type_checks() {
    let mut cg = CodeGen::new("checks");
    let int = cg.const_value(Value::integer(1));
    let big = cg.const_value(Value::big_int(1));
    let date = cg.const_value(Value::date(1));
    let text = cg.const_value(Value::varchar("x"));

    assert!(cg.add(int, big).is_err());
    assert!(cg.add(date, date).is_err());
    assert!(cg.compare(CompareOp::Lt, int, big).is_err());
    assert!(cg.cast(text, SqlType::Integer).is_err());
    assert!(cg.not(int).is_err());
    assert!(cg.emit_if_then(int, |_| Ok(())).is_err());
}

#[test]
fn invoke_checks_argument_count_and_types() {
    let mut cg = CodeGen::new("id");
    let a = cg.param(0, SqlType::Integer).expect("param");
    cg.ret(&[a]);
    let func = cg.finish().expect("seal");

    assert!(matches!(
        func.invoke(&mut [], &[]),
        Err(ExecError::ArgumentCount {
            expected: 1,
            found: 0,
            ..
        })
    ));
    assert!(matches!(
        func.invoke(&mut [], &[Value::big_int(1)]),
        Err(ExecError::ArgumentType { index: 0, .. })
    ));
}

#[test]
fn emit_if_takes_else_arm_on_false_and_null() {
    let build = || {
        let mut cg = CodeGen::new("pick");
        let cond = cg.param(0, SqlType::Boolean).expect("param");
        let out = cg.const_null(SqlType::Integer);
        cg.emit_if(
            cond,
            |cg| {
                let one = cg.const_value(Value::integer(1));
                cg.copy(out, one)
            },
            |cg| {
                let two = cg.const_value(Value::integer(2));
                cg.copy(out, two)
            },
        )
        .expect("if");
        cg.ret(&[out]);
        cg.finish().expect("seal")
    };
    let func = build();

    let run = |arg: Value| func.invoke(&mut [], &[arg]).expect("invoke");
    assert_eq!(run(Value::boolean(true)), vec![Value::integer(1)]);
    assert_eq!(run(Value::boolean(false)), vec![Value::integer(2)]);
    assert_eq!(run(Value::null(SqlType::Boolean)), vec![Value::integer(2)]);
}

#[test]
fn arithmetic_failures_surface_at_run_time() {
    let mut cg = CodeGen::new("div");
    let a = cg.param(0, SqlType::BigInt).expect("param");
    let b = cg.param(1, SqlType::BigInt).expect("param");
    let q = cg.div(a, b).expect("div");
    cg.ret(&[q]);
    let func = cg.finish().expect("seal");

    let err = func
        .invoke(&mut [], &[Value::big_int(1), Value::big_int(0)])
        .expect_err("division by zero must fail");

    assert_eq!(err, ExecError::Value(ValueError::DivisionByZero));
    assert!(err.is_arithmetic());
}

#[test]
fn storage_round_trip_through_emitted_code() {
    let storage = storage_with(&[SqlType::BigInt, SqlType::Double]);
    let mut cg = CodeGen::new("write");
    let space = cg.storage_space().expect("space");
    let v = cg.param(0, SqlType::BigInt).expect("param");
    storage.store(&mut cg, space, 0, v).expect("store");
    storage.clear(&mut cg, space, 1).expect("clear");
    let loaded = storage.load(&mut cg, space, 0).expect("load");
    let set = storage.is_set(&mut cg, space, 1).expect("is_set");
    cg.ret(&[loaded, set]);
    let func = cg.finish().expect("seal");

    let mut buffer = storage.allocate_space().expect("allocate");
    let out = func
        .invoke(&mut buffer, &[Value::big_int(-9)])
        .expect("invoke");

    assert_eq!(out, vec![Value::big_int(-9), Value::boolean(false)]);
}

#[test]
fn wrong_buffer_size_is_rejected() {
    let storage = storage_with(&[SqlType::BigInt]);
    let mut cg = CodeGen::new("touch");
    let space = cg.storage_space().expect("space");
    storage.clear(&mut cg, space, 0).expect("clear");
    let func = cg.finish().expect("seal");

    let mut short = vec![0u8; storage.storage_size() - 1];
    assert!(matches!(
        func.invoke(&mut short, &[]),
        Err(ExecError::BufferSize { .. })
    ));
}

#[test]
fn storage_space_cannot_be_declared_twice() {
    let mut cg = CodeGen::new("twice");
    cg.storage_space().expect("first");

    assert!(cg.storage_space().is_err());
}

#[test]
fn finish_appends_trailing_return() {
    let mut cg = CodeGen::new("empty");
    let _ = cg.const_value(Value::boolean(true));
    let func = cg.finish().expect("seal");

    assert!(matches!(func.instructions().last(), Some(Instr::Return(v)) if v.is_empty()));
    assert!(func.listing().starts_with("fn empty()"));
}

#[test]
fn compiled_function_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<crate::codegen::CompiledFunction>();
}
