use std::io::Write;

use pretty_assertions::assert_eq;
use runmock_core::DefaultCallCount;
use runmock_core::ErrorCategory;
use runmock_core::MockSuite;
use runmock_core::MockerConfig;
use runmock_runtime::Value;
use runmock_test_support::FIXTURE;
use runmock_test_support::fixture_runtime;
use runmock_test_support::init_tracing;

#[test]
fn teardown_puts_every_kind_of_override_back() {
    init_tracing();
    let runtime = fixture_runtime();
    let suite = MockSuite::new(&runtime);

    let handle = suite.methods().mock(FIXTURE, "staticFunc").expect("mock");
    handle.will_return_value("mocked").expect("configure");
    suite
        .properties()
        .set_static_and_restore(FIXTURE, "_privateProperty", "mocked property")
        .expect("property");
    suite
        .constants()
        .mock(Some(FIXTURE), "TEST_CONSTANT", "mocked constant")
        .expect("constant");

    assert_eq!(
        runtime.call_static(FIXTURE, "staticFunc", Vec::new()).expect("call"),
        Value::from("mocked")
    );
    suite.teardown().expect("all verified");

    assert_eq!(
        runtime.call_static(FIXTURE, "staticFunc", Vec::new()).expect("call"),
        Value::from("original public static")
    );
    assert_eq!(
        runtime
            .call_static(FIXTURE, "getPrivateStatic", Vec::new())
            .expect("call"),
        Value::from("testPrivateStatic")
    );
    assert_eq!(
        runtime.call_static(FIXTURE, "getConst", Vec::new()).expect("call"),
        Value::from("original constant")
    );
    assert!(handle.is_restored());
}

#[test]
fn strict_teardown_reports_unverified_mocks() {
    let runtime = fixture_runtime();
    let suite = MockSuite::new(&runtime);
    suite.methods().mock(FIXTURE, "methodNoArgs").expect("mock");
    let err = suite.teardown().expect_err("never called");
    assert_eq!(err.category(), ErrorCategory::VerificationFailure);
    assert_eq!(err.to_string(), "Fixture::methodNoArgs - is not called!");
}

#[test]
fn suite_built_from_a_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("runmock.toml");
    let mut file = std::fs::File::create(&path).expect("create");
    writeln!(file, "strict_teardown = false").expect("write");
    writeln!(file, "default_call_count = \"any\"").expect("write");
    drop(file);

    let config = MockerConfig::load_from_path(&path).expect("load");
    assert_eq!(config.default_call_count, DefaultCallCount::Any);

    let runtime = fixture_runtime();
    let suite = MockSuite::with_config(&runtime, config);
    assert!(!suite.config().strict_teardown);
    suite.methods().mock(FIXTURE, "methodNoArgs").expect("mock");
    suite.teardown().expect("nothing to verify");
    assert_eq!(suite.methods().active_count(), 0);
}
