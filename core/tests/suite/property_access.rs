use pretty_assertions::assert_eq;
use runmock_core::ErrorCategory;
use runmock_core::PropertyAccess;
use runmock_runtime::Value;
use runmock_test_support::CHILD_FIXTURE;
use runmock_test_support::FIXTURE;
use runmock_test_support::fixture_runtime;
use runmock_test_support::new_child;

#[test]
fn private_static_override_is_visible_to_class_code() {
    let runtime = fixture_runtime();
    let access = PropertyAccess::new(&runtime);
    access
        .set_static_and_restore(FIXTURE, "_privateProperty", "overridden")
        .expect("set");
    assert_eq!(
        runtime
            .call_static(FIXTURE, "getPrivateStatic", Vec::new())
            .expect("call"),
        Value::from("overridden")
    );

    access
        .restore_static(FIXTURE, "_privateProperty")
        .expect("restore");
    assert_eq!(
        runtime
            .call_static(FIXTURE, "getPrivateStatic", Vec::new())
            .expect("call"),
        Value::from("testPrivateStatic")
    );
}

#[test]
fn overrides_through_the_child_stack_on_the_declaring_class() {
    let runtime = fixture_runtime();
    let access = PropertyAccess::new(&runtime);
    access
        .set_static_and_restore(CHILD_FIXTURE, "_otherProperty", "first")
        .expect("first");
    access
        .set_static_and_restore(FIXTURE, "_otherProperty", "second")
        .expect("second");
    assert_eq!(access.pending(CHILD_FIXTURE, "_otherProperty"), 2);
    assert_eq!(
        access.get_static(CHILD_FIXTURE, "_otherProperty").expect("get"),
        Value::from("second")
    );

    access
        .restore_static(CHILD_FIXTURE, "_otherProperty")
        .expect("pop second");
    assert_eq!(
        access.get_static(FIXTURE, "_otherProperty").expect("get"),
        Value::from("first")
    );
    access.restore_static_all().expect("restore all");
    assert_eq!(
        access.get_static(FIXTURE, "_otherProperty").expect("get"),
        Value::from("otherStatic")
    );

    let err = access
        .restore_static(FIXTURE, "_otherProperty")
        .expect_err("nothing pending");
    assert_eq!(err.category(), ErrorCategory::StackUnderflow);
    assert_eq!(err.to_string(), "Fixture::_otherProperty was not modified");
}

#[test]
fn plain_writes_are_not_recorded() {
    let runtime = fixture_runtime();
    let access = PropertyAccess::new(&runtime);
    access
        .set_static(FIXTURE, "publicProperty", "changed")
        .expect("set");
    assert!(!access.has_pending());
    access.restore_static_all().expect("nothing to do");
    assert_eq!(
        runtime
            .static_property(FIXTURE, "publicProperty")
            .expect("public read"),
        Value::from("changed")
    );
}

#[test]
fn instance_properties_ignore_visibility() {
    let runtime = fixture_runtime();
    let access = PropertyAccess::new(&runtime);
    let object = new_child(&runtime);

    let err = runtime
        .property(&object, "_protectedProperty")
        .expect_err("protected from outside");
    assert_eq!(
        err.to_string(),
        "Cannot access protected property Fixture::$_protectedProperty"
    );

    access
        .set(&object, "_protectedProperty", "patched")
        .expect("set");
    assert_eq!(
        access.get(&object, "_protectedProperty").expect("get"),
        Value::from("patched")
    );
    assert_eq!(
        runtime
            .call_method(&object, "getProtectedProperty", Vec::new())
            .expect("class code"),
        Value::from("patched")
    );
    assert_eq!(
        runtime.property(&object, "publicField").expect("public"),
        Value::from("publicInstance")
    );
}
