//! Declared parameter and return contracts hold for overridden methods too.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use runmock_core::ErrorCategory;
use runmock_core::MethodMocker;
use runmock_core::MockError;
use runmock_runtime::Value;
use runmock_test_support::FIXTURE;
use runmock_test_support::fixture_runtime;
use runmock_test_support::new_child;
use runmock_test_support::new_fixture;

fn complex_args(runtime: &runmock_runtime::Runtime) -> Vec<Value> {
    vec![
        Value::from("ref"),
        Value::from(new_fixture(runtime)),
        Value::List(Vec::new()),
        Value::Float(1.5),
        Value::from("nullable"),
        Value::from("required"),
    ]
}

#[test]
fn argument_contract_is_enforced_before_the_override_runs() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let handle = mocker.mock(FIXTURE, "complexParams").expect("mock");
    handle
        .any_call()
        .expect("configure")
        .will_return_value("complex mocked")
        .expect("configure");

    let err = runtime
        .call_static(FIXTURE, "complexParams", vec![Value::from("ref")])
        .expect_err("too few");
    assert_eq!(
        err.to_string(),
        "Too few arguments to function Fixture::complexParams(), 1 passed and at least 6 expected"
    );
    assert!(err.is_contract_violation());
    assert_eq!(ErrorCategory::of_runtime(&err), ErrorCategory::ContractViolation);

    let cases = [
        (1, Value::Int(5), "Argument #2 ($objParam) must be of type Fixture, int given"),
        (2, Value::Float(0.5), "Argument #3 ($arrParam) must be of type array, float given"),
        (3, Value::from("x"), "Argument #4 ($floatParam) must be of type float, string given"),
        (4, Value::Int(1), "Argument #5 ($nullableParam) must be of type ?string, int given"),
    ];
    for (idx, bad, message) in cases {
        let mut args = complex_args(&runtime);
        args[idx] = bad;
        let err = runtime
            .call_static(FIXTURE, "complexParams", args)
            .expect_err("bad type");
        assert_eq!(err.to_string(), format!("Fixture::complexParams(): {message}"));
    }
    assert_eq!(handle.call_count(), 0);

    let mut args = complex_args(&runtime);
    args[1] = Value::from(new_child(&runtime));
    args[4] = Value::Null;
    assert_eq!(
        runtime
            .call_static(FIXTURE, "complexParams", args)
            .expect("subclass and null accepted"),
        Value::from("complex mocked")
    );
    assert_eq!(handle.call_count(), 1);
    mocker.restore_all(true).expect("verified");
}

#[test]
fn sniffed_method_still_writes_back_by_reference() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let handle = mocker.sniff(FIXTURE, "complexParams").expect("sniff");

    let mut args = complex_args(&runtime);
    let result = runtime
        .call_static_with_refs(FIXTURE, "complexParams", &mut args)
        .expect("call");
    assert_eq!(result, Value::from("complex original"));
    assert_eq!(args[0], Value::from("changed by original"));
    assert_eq!(handle.call_log()[0][0], Value::from("ref"));
    mocker.restore_all(true).expect("verified");
}

#[test]
fn defaults_fill_missing_parameters_under_a_sniff() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let handle = mocker.sniff(FIXTURE, "defaultValues").expect("sniff");

    let mut array_default = BTreeMap::new();
    array_default.insert("a".to_string(), Value::List(vec![Value::Null]));
    let mut expected = BTreeMap::new();
    expected.insert("arrayParam".to_string(), Value::Map(array_default));
    expected.insert("floatParam".to_string(), Value::Float(2.5));
    expected.insert("stringParam".to_string(), Value::from("asd"));
    expected.insert("boolParam".to_string(), Value::Bool(true));
    expected.insert("nullParam".to_string(), Value::Null);

    assert_eq!(
        runtime
            .call_static(FIXTURE, "defaultValues", Vec::new())
            .expect("call"),
        Value::Map(expected)
    );
    assert_eq!(handle.call_log(), vec![Vec::<Value>::new()]);
    mocker.restore_all(true).expect("verified");
}

#[test]
fn variadic_parameters_collect_and_check_each_element() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    mocker.sniff(FIXTURE, "variadicParam").expect("sniff");

    let variadic = |values: Vec<Value>| {
        let mut vars = BTreeMap::new();
        vars.insert("variadicParam".to_string(), Value::List(values));
        Value::Map(vars)
    };
    for passed in [vec![], vec![Value::Int(1)], vec![Value::Int(1), Value::Int(2)]] {
        assert_eq!(
            runtime
                .call_static(FIXTURE, "variadicParam", passed.clone())
                .expect("call"),
            variadic(passed)
        );
    }

    let err = runtime
        .call_static(FIXTURE, "variadicParam", vec![Value::from("asd")])
        .expect_err("string element");
    assert_eq!(
        err.to_string(),
        "Fixture::variadicParam(): Argument #1 ($variadicParam) must be of type int, string given"
    );
    mocker.restore_all(true).expect("verified");
}

#[test]
fn return_contract_applies_to_substituted_values() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    mocker.mock(FIXTURE, "returnInt").expect("mock");
    let nullable = mocker.mock(FIXTURE, "returnNullable").expect("mock");
    nullable
        .will_return_value_list(vec![Value::Null, Value::List(Vec::new())])
        .expect("configure");

    let err = runtime
        .call_static(FIXTURE, "returnInt", Vec::new())
        .expect_err("null for int");
    assert_eq!(
        err.to_string(),
        "Fixture::returnInt(): Return value must be of type int, null returned"
    );

    assert_eq!(
        runtime
            .call_static(FIXTURE, "returnNullable", Vec::new())
            .expect("null is fine"),
        Value::Null
    );
    let err = runtime
        .call_static(FIXTURE, "returnNullable", Vec::new())
        .expect_err("array for ?int");
    assert_eq!(
        err.to_string(),
        "Fixture::returnNullable(): Return value must be of type ?int, array returned"
    );
    mocker.restore_all(true).expect("both called");
}

#[test]
fn void_methods_only_accept_null() {
    let runtime = fixture_runtime();
    let mocker = MethodMocker::new(&runtime);
    let handle = mocker.mock(FIXTURE, "voidMock").expect("mock");
    handle.will_return_void().expect("configure");
    assert_eq!(
        runtime.call_static(FIXTURE, "voidMock", Vec::new()).expect("void"),
        Value::Null
    );

    handle.will_return_value("oops").expect("configure");
    let err = MockError::from(
        runtime
            .call_static(FIXTURE, "voidMock", Vec::new())
            .expect_err("value from void"),
    );
    assert_eq!(err.category(), ErrorCategory::ContractViolation);
    assert_eq!(
        err.to_string(),
        "Fixture::voidMock(): Return value must be of type void, string returned"
    );
    mocker.restore_all(true).expect("verified");
}
