mod method_mocker;
mod property_access;
mod signature_contract;
mod suite_teardown;
