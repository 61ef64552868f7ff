use std::cell::Cell;
use std::rc::Rc;

use maplit::btreemap;
use pretty_assertions::assert_eq;
use runmock_core::ActionFn;
use runmock_core::ActionSpec;
use runmock_core::ErrorCategory;
use runmock_core::ExpectedArgs;
use runmock_core::MethodMocker;
use runmock_core::MockError;
use runmock_runtime::CallTarget;
use runmock_runtime::RuntimeError;
use runmock_runtime::Value;
use runmock_test_support::CHILD_FIXTURE;
use runmock_test_support::FIXTURE;
use runmock_test_support::fixture_runtime;
use runmock_test_support::init_tracing;
use runmock_test_support::new_child;

fn call(runtime: &runmock_runtime::Runtime, method: &str, args: Vec<Value>) -> Result<Value, MockError> {
    Ok(runtime.call_static(FIXTURE, method, args)?)
}

fn action<F>(f: F) -> ActionFn
where
    F: Fn(&[Value], Option<&Value>) -> runmock_runtime::Result<Value> + 'static,
{
    Rc::new(f)
}

#[test]
fn expected_args_and_value_sequence() {
    init_tracing();
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    mocker
        .mock(FIXTURE, "staticMethodArgs")
        .expect("mock")
        .expect_args(vec![Value::from("a"), Value::Int(1)])
        .expect("configure")
        .expect_call(2)
        .expect("configure")
        .will_return_value_list(vec![Value::from("one"), Value::from("two")])
        .expect("configure");

    let args = || vec![Value::from("a"), Value::Int(1)];
    assert_eq!(call(&runtime, "staticMethodArgs", args()).expect("1st"), Value::from("one"));
    assert_eq!(call(&runtime, "staticMethodArgs", args()).expect("2nd"), Value::from("two"));

    let err = call(&runtime, "staticMethodArgs", args()).expect_err("3rd");
    assert_eq!(
        err.to_string(),
        "Fixture::staticMethodArgs - expected 2 calls, but more appeared"
    );
    assert_eq!(err.category(), ErrorCategory::CallCountViolation);

    let err = mocker.restore_all(true).expect_err("three calls made");
    assert_eq!(
        err.to_string(),
        "Fixture::staticMethodArgs - unexpected call count: expected 2, got 3"
    );
}

#[test]
fn argument_mismatches_fail_the_call() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let handle = mocker.mock(FIXTURE, "staticMethodArgs").expect("mock");
    handle
        .expect_args(vec![Value::from("a"), Value::from("b")])
        .expect("configure");

    let err = call(&runtime, "staticMethodArgs", vec!["a".into(), "c".into()]).expect_err("mismatch");
    assert_eq!(
        err.to_string(),
        r#"Fixture::staticMethodArgs - unexpected args: expected ["a","b"], got ["a","c"]"#
    );
    assert_eq!(err.category(), ErrorCategory::ArgumentMismatch);

    handle
        .expect_some_args(btreemap! { 1 => Value::from("b") })
        .expect("configure");
    call(&runtime, "staticMethodArgs", vec!["z".into(), "b".into()]).expect("subset matches");
    let err = call(&runtime, "staticMethodArgs", vec!["a".into(), "a".into()]).expect_err("subset");
    assert_eq!(err.category(), ErrorCategory::ArgumentMismatch);
    assert!(err.to_string().contains("unexpected args subset"), "{err}");

    let no_args = mocker.mock(FIXTURE, "methodNoArgs").expect("mock");
    no_args.expect_no_args().expect("configure");
    call(&runtime, "methodNoArgs", Vec::new()).expect("no args");
    let err = call(&runtime, "methodNoArgs", vec![Value::Null]).expect_err("extra");
    assert_eq!(
        err.to_string(),
        "Fixture::methodNoArgs - expected no args, but they appeared"
    );
    mocker.restore_all(true).expect("calls recorded");
}

#[test]
fn args_list_is_consumed_one_entry_per_call() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let handle = mocker.mock(FIXTURE, "staticMethodArgs").expect("mock");
    handle
        .expect_args_list(vec![
            ExpectedArgs::Exact(vec![1.into(), 2.into()]),
            ExpectedArgs::Exact(vec![3.into(), 4.into()]),
        ])
        .expect("configure");

    call(&runtime, "staticMethodArgs", vec![1.into(), 2.into()]).expect("first");
    call(&runtime, "staticMethodArgs", vec![3.into(), 4.into()]).expect("second");
    let err = call(&runtime, "staticMethodArgs", vec![5.into(), 6.into()]).expect_err("third");
    assert_eq!(err.to_string(), "Fixture::staticMethodArgs - expect args list ended");

    let err = handle
        .expect_args_list(vec![ExpectedArgs::None, ExpectedArgs::Exact(Vec::new())])
        .expect_err("empty entry");
    assert_eq!(
        err.to_string(),
        "Fixture::staticMethodArgs - args list item 1: expected not empty array or false"
    );
    let err = handle.expect_args(Vec::new()).expect_err("no args given");
    assert_eq!(
        err.to_string(),
        "Fixture::staticMethodArgs - method expectArgs() requires at least one arg!"
    );
    handle.expect_args(vec![Value::Null]).expect("single null is valid");
    mocker.restore_all(true).expect("called");
}

#[test]
fn thrown_exceptions_reach_the_caller_unchanged() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let handle = mocker.mock(FIXTURE, "staticFunc").expect("mock");
    handle
        .will_throw_exception("custom failure", Some("DomainException"))
        .expect("configure");

    let err = runtime
        .call_static(FIXTURE, "staticFunc", Vec::new())
        .expect_err("thrown");
    assert_eq!(err.thrown_kind(), Some("DomainException"));
    assert_eq!(err.to_string(), "custom failure");

    handle.will_throw_exception("plain", None).expect("configure");
    let err = call(&runtime, "staticFunc", Vec::new()).expect_err("thrown");
    assert_eq!(err.thrown_kind(), Some("Exception"));
    assert_eq!(err.category(), ErrorCategory::HostError);
    mocker.restore_all(true).expect("called");
}

#[test]
fn actions_receive_args_and_the_additional_var() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let handle = mocker.mock(FIXTURE, "staticMethodArgs").expect("mock");
    handle
        .set_additional_var("extra")
        .expect("configure")
        .will_return_action(|args, additional| {
            Ok(Value::from(format!(
                "{} {} {}",
                args[0],
                args[1],
                additional.cloned().unwrap_or_default()
            )))
        })
        .expect("configure");
    assert_eq!(
        call(&runtime, "staticMethodArgs", vec!["x".into(), "y".into()]).expect("call"),
        Value::from("x y extra")
    );

    let first = action(|_, _| Ok(Value::Int(1)));
    let second = action(|_, _| {
        Err(RuntimeError::thrown("RuntimeException", "second action failed"))
    });
    handle.will_return_action_list(vec![first, second]).expect("configure");
    assert_eq!(
        call(&runtime, "staticMethodArgs", vec![1.into(), 2.into()]).expect("first"),
        Value::Int(1)
    );
    let err = call(&runtime, "staticMethodArgs", vec![1.into(), 2.into()]).expect_err("second");
    assert_eq!(err.thrown_kind(), Some("RuntimeException"));
    let err = call(&runtime, "staticMethodArgs", vec![1.into(), 2.into()]).expect_err("ended");
    assert_eq!(
        err.to_string(),
        "Fixture::staticMethodArgs - return action list ended"
    );
    assert_eq!(err.category(), ErrorCategory::ActionExhausted);
    assert_eq!(handle.call_count(), 4);
    mocker.restore_all(true).expect("called");
}

#[test]
fn mocks_reached_through_protected_and_instance_callers() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    mocker
        .mock_with(
            FIXTURE,
            "_protectedStaticFunc",
            ActionSpec::FixedValue(Value::from("mocked protected static")),
        )
        .expect("mock");
    mocker
        .mock_with(
            FIXTURE,
            "_protectedFunc",
            ActionSpec::FixedValue(Value::from("mocked protected")),
        )
        .expect("mock");

    assert_eq!(
        runtime
            .call_static(CHILD_FIXTURE, "callProtectedStatic", Vec::new())
            .expect("static"),
        Value::from("mocked protected static")
    );
    let object = new_child(&runtime);
    assert_eq!(
        runtime.call_method(&object, "callProtected", Vec::new()).expect("instance"),
        Value::from("mocked protected")
    );
    mocker.restore_all(true).expect("both called");
    assert_eq!(
        runtime.call_method(&object, "callProtected", Vec::new()).expect("instance"),
        Value::from("original protected")
    );
}

#[test]
fn sniff_registrations_only_accept_observers() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let err = mocker
        .sniff_with(FIXTURE, "staticFunc", ActionSpec::FixedValue(Value::Int(1)))
        .expect_err("value for sniff");
    assert_eq!(
        err.to_string(),
        "Fixture::staticFunc - Sniff mode does not support full mock"
    );
    assert_eq!(mocker.active_count(), 0);

    let observed = Rc::new(Cell::new(0));
    let counter = Rc::clone(&observed);
    mocker
        .sniff_with(
            FIXTURE,
            "staticFunc",
            ActionSpec::observe(move |_, result, _| {
                assert_eq!(result, &Value::from("original public static"));
                counter.set(counter.get() + 1);
                Ok(())
            }),
        )
        .expect("sniff");
    assert_eq!(
        call(&runtime, "staticFunc", Vec::new()).expect("call"),
        Value::from("original public static")
    );
    assert_eq!(observed.get(), 1);

    let err = mocker
        .mock_with(
            FIXTURE,
            "methodNoArgs",
            ActionSpec::observe(|_, _, _| Ok(())),
        )
        .expect_err("observer on replace");
    assert_eq!(
        err.to_string(),
        "Fixture::methodNoArgs - observer actions require sniff mode"
    );
    mocker.restore_all(true).expect("sniff called");
}

#[test]
fn registry_rejects_duplicates_and_restores_in_reverse() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    mocker.mock(FIXTURE, "staticFunc").expect("mock");
    let err = mocker.mock(FIXTURE, "staticFunc").expect_err("duplicate");
    assert_eq!(err.to_string(), "Fixture::staticFunc is already mocked!");

    mocker.mock(FIXTURE, "methodNoArgs").expect("mock");
    mocker.mock(CHILD_FIXTURE, "_redefinedStaticFunc").expect("mock");
    assert_eq!(mocker.active_count(), 3);

    let err = mocker.restore_all(true).expect_err("none called");
    let failures: Vec<String> = err.failures().iter().map(ToString::to_string).collect();
    assert_eq!(
        failures,
        vec![
            "ChildFixture::_redefinedStaticFunc - is not called!".to_string(),
            "Fixture::methodNoArgs - is not called!".to_string(),
            "Fixture::staticFunc - is not called!".to_string(),
        ]
    );
    assert_eq!(mocker.active_count(), 0);
    assert_eq!(
        call(&runtime, "staticFunc", Vec::new()).expect("restored"),
        Value::from("original public static")
    );
}

#[test]
fn restored_handle_refuses_reconfiguration() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let handle = mocker.mock(FIXTURE, "staticFunc").expect("mock");
    handle.single_call().expect("configure");
    call(&runtime, "staticFunc", Vec::new()).expect("call");
    handle.restore().expect("verified");

    let err = handle.expect_call(3).expect_err("restored");
    assert_eq!(err.category(), ErrorCategory::RestoredStateViolation);
    assert_eq!(err.to_string(), "Fixture::staticFunc - mock entity is restored!");
    assert!(mocker.find("Fixture::staticFunc").is_none());

    let again = mocker.mock(FIXTURE, "staticFunc").expect("mock after restore");
    again.expect_call(0).expect("configure");
    mocker.restore_all(true).expect("never called, as expected");
}

#[test]
fn call_private_reaches_hidden_methods_only() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let class = CallTarget::from(FIXTURE);
    assert_eq!(
        mocker
            .call_private(&class, "_protectedArgs", vec!["x".into()])
            .expect("protected static"),
        Value::from("protected args x")
    );
    assert_eq!(
        mocker
            .call_private(&class, "_privateStaticFunc", Vec::new())
            .expect("private static"),
        Value::from("original private static")
    );
    let object = CallTarget::from(new_child(&runtime));
    assert_eq!(
        mocker
            .call_private(&object, "_protectedFunc", Vec::new())
            .expect("protected instance"),
        Value::from("original protected")
    );
    let err = mocker
        .call_private(&class, "staticFunc", Vec::new())
        .expect_err("public");
    assert_eq!(
        err.to_string(),
        "Fixture::staticFunc - is not private and is not protected!"
    );
}
