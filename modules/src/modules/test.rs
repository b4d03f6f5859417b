use std::sync::Arc;

use substrate_engine::{ConstantDef, Module};
use substrate_error::{ErrorKind, ScriptError};
use substrate_value::UniversalValue;

use crate::collaborator::{collaborator_module, expect_str, forward};

collaborator_module! {
    trait TestCollaborator;
    stub StubTestCollaborator;
    module_name = "test";
    functions {
        suite("declare a named test suite containing a list of test names", Some(2), false),
        test("register a single named test case with its body", Some(2), false),
        before_all("register a callback to run once before a suite's tests", Some(2), false),
        after_all("register a callback to run once after a suite's tests", Some(2), false),
        before_each("register a callback to run before every test in a suite", Some(2), false),
        after_each("register a callback to run after every test in a suite", Some(2), false),
        run("run a single named test and report its outcome", Some(1), false),
        run_all("run every registered test and report aggregate outcomes", Some(0), false),
        run_with_filter("run every registered test whose name matches a filter", Some(1), false),
        assert_throws("assert that calling a function raises, returning the error", Some(1), false),
        assert_no_throw("assert that calling a function does not raise", Some(1), false),
        create_mock("create a mock callable recording every call it receives", Some(1), false),
        create_stub("create a stub callable returning a fixed value", Some(1), false),
        create_spy("wrap an existing callable, recording calls while preserving behavior", Some(1), false),
        get_results("fetch the results recorded for every test run so far", Some(0), true),
        generate_report("render recorded test results in a given report format", Some(1), true),
    }
}

const RESULT_PASSED: &str = "passed";
const RESULT_FAILED: &str = "failed";
const RESULT_SKIPPED: &str = "skipped";
const RESULT_ERROR: &str = "error";
const REPORT_FORMAT_JSON: &str = "json";
const REPORT_FORMAT_JUNIT: &str = "junit";
const REPORT_FORMAT_TEXT: &str = "text";

fn is_truthy(value: &UniversalValue) -> bool {
    !matches!(value, UniversalValue::Nil | UniversalValue::Bool(false))
}

fn describe(value: &UniversalValue) -> String {
    format!("{value:?}")
}

/// Raises [`ErrorKind::AssertionFailed`] if `condition` is falsy (`nil`
/// or `false`). Any other argument at index 1 is used as the failure
/// message, `Debug`-formatted.
pub fn assert(args: &[UniversalValue]) -> Result<(), ScriptError> {
    let condition = args.get(0).map(is_truthy).unwrap_or(false);
    if condition {
        return Ok(());
    }
    let message = args.get(1).map(describe).unwrap_or_else(|| "assertion failed".to_string());
    Err(ScriptError::new(ErrorKind::AssertionFailed, message))
}

/// Raises [`ErrorKind::AssertionFailed`] unless the two values are equal.
pub fn assert_eq(a: &UniversalValue, b: &UniversalValue) -> Result<(), ScriptError> {
    if a == b {
        Ok(())
    } else {
        Err(ScriptError::new(ErrorKind::AssertionFailed, format!("expected {a:?} to equal {b:?}")))
    }
}

/// Raises [`ErrorKind::AssertionFailed`] if the two values are equal.
pub fn assert_ne(a: &UniversalValue, b: &UniversalValue) -> Result<(), ScriptError> {
    if a != b {
        Ok(())
    } else {
        Err(ScriptError::new(ErrorKind::AssertionFailed, format!("expected {a:?} to not equal {b:?}")))
    }
}

/// Raises [`ErrorKind::AssertionFailed`] unless the value is `true`.
pub fn assert_true(value: &UniversalValue) -> Result<(), ScriptError> {
    if matches!(value, UniversalValue::Bool(true)) {
        Ok(())
    } else {
        Err(ScriptError::new(ErrorKind::AssertionFailed, format!("expected true, got {value:?}")))
    }
}

/// Raises [`ErrorKind::AssertionFailed`] unless the value is `false`.
pub fn assert_false(value: &UniversalValue) -> Result<(), ScriptError> {
    if matches!(value, UniversalValue::Bool(false)) {
        Ok(())
    } else {
        Err(ScriptError::new(ErrorKind::AssertionFailed, format!("expected false, got {value:?}")))
    }
}

/// Raises [`ErrorKind::AssertionFailed`] unless the value is `nil`.
pub fn assert_nil(value: &UniversalValue) -> Result<(), ScriptError> {
    if matches!(value, UniversalValue::Nil) {
        Ok(())
    } else {
        Err(ScriptError::new(ErrorKind::AssertionFailed, format!("expected nil, got {value:?}")))
    }
}

/// Raises [`ErrorKind::AssertionFailed`] if the value is `nil`.
pub fn assert_not_nil(value: &UniversalValue) -> Result<(), ScriptError> {
    if !matches!(value, UniversalValue::Nil) {
        Ok(())
    } else {
        Err(ScriptError::new(ErrorKind::AssertionFailed, "expected a non-nil value"))
    }
}

/// Raises [`ErrorKind::AssertionFailed`] unless `haystack` contains
/// `needle` — substring search for strings, membership search for
/// arrays, key presence for objects.
pub fn assert_contains(haystack: &UniversalValue, needle: &UniversalValue) -> Result<(), ScriptError> {
    let found = match haystack {
        UniversalValue::Str(bytes) => {
            if let UniversalValue::Str(sub) = needle {
                let haystack_str = String::from_utf8_lossy(bytes);
                let needle_str = String::from_utf8_lossy(sub);
                haystack_str.contains(needle_str.as_ref())
            } else {
                false
            }
        }
        UniversalValue::Array(items) => items.contains(needle),
        UniversalValue::Object(fields) => {
            if let UniversalValue::Str(key) = needle {
                fields.contains_key(String::from_utf8_lossy(key).as_ref())
            } else {
                false
            }
        }
        _ => false,
    };
    if found {
        Ok(())
    } else {
        Err(ScriptError::new(ErrorKind::AssertionFailed, format!("expected {haystack:?} to contain {needle:?}")))
    }
}

/// Unconditionally raises [`ErrorKind::AssertionFailed`] with the given
/// message.
pub fn fail(message: &str) -> ScriptError {
    ScriptError::new(ErrorKind::AssertionFailed, message)
}

/// Raises [`ErrorKind::TestSkipped`] with the given reason.
pub fn skip(reason: &str) -> ScriptError {
    ScriptError::new(ErrorKind::TestSkipped, reason)
}

pub fn build_module(collaborator: Arc<dyn TestCollaborator>) -> Module {
    let module = Module::new("test", "1.0.0", "declaring, running, and asserting within in-script tests");
    wire_collaborator_functions(module, collaborator)
        .with_function(forward("assert", "raise AssertionFailed if the condition is falsy", None, false, |args| {
            assert(args)?;
            Ok(vec![])
        }))
        .with_function(forward("assert_eq", "raise AssertionFailed if the two values are not equal", Some(2), false, |args| {
            let a = args.get(0).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'a'"))?;
            let b = args.get(1).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'b'"))?;
            assert_eq(a, b)?;
            Ok(vec![])
        }))
        .with_function(forward("assert_ne", "raise AssertionFailed if the two values are equal", Some(2), false, |args| {
            let a = args.get(0).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'a'"))?;
            let b = args.get(1).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'b'"))?;
            assert_ne(a, b)?;
            Ok(vec![])
        }))
        .with_function(forward("assert_true", "raise AssertionFailed unless the value is true", Some(1), false, |args| {
            let value = args.get(0).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'value'"))?;
            assert_true(value)?;
            Ok(vec![])
        }))
        .with_function(forward("assert_false", "raise AssertionFailed unless the value is false", Some(1), false, |args| {
            let value = args.get(0).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'value'"))?;
            assert_false(value)?;
            Ok(vec![])
        }))
        .with_function(forward("assert_nil", "raise AssertionFailed unless the value is nil", Some(1), false, |args| {
            let value = args.get(0).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'value'"))?;
            assert_nil(value)?;
            Ok(vec![])
        }))
        .with_function(forward("assert_not_nil", "raise AssertionFailed if the value is nil", Some(1), false, |args| {
            let value = args.get(0).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'value'"))?;
            assert_not_nil(value)?;
            Ok(vec![])
        }))
        .with_function(forward(
            "assert_contains",
            "raise AssertionFailed unless the first value contains the second",
            Some(2),
            false,
            |args| {
                let haystack =
                    args.get(0).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'haystack'"))?;
                let needle =
                    args.get(1).ok_or_else(|| ScriptError::new(ErrorKind::MissingField, "missing argument 'needle'"))?;
                assert_contains(haystack, needle)?;
                Ok(vec![])
            },
        ))
        .with_function(forward("fail", "raise AssertionFailed with the given message", Some(1), false, |args| {
            Err(fail(&expect_str(args, 0, "message")?))
        }))
        .with_function(forward("skip", "raise TestSkipped with the given reason", Some(1), false, |args| {
            Err(skip(&expect_str(args, 0, "reason")?))
        }))
        .with_constant(ConstantDef { name: "RESULT_PASSED".to_string(), value: UniversalValue::from(RESULT_PASSED) })
        .with_constant(ConstantDef { name: "RESULT_FAILED".to_string(), value: UniversalValue::from(RESULT_FAILED) })
        .with_constant(ConstantDef { name: "RESULT_SKIPPED".to_string(), value: UniversalValue::from(RESULT_SKIPPED) })
        .with_constant(ConstantDef { name: "RESULT_ERROR".to_string(), value: UniversalValue::from(RESULT_ERROR) })
        .with_constant(ConstantDef {
            name: "REPORT_FORMAT_JSON".to_string(),
            value: UniversalValue::from(REPORT_FORMAT_JSON),
        })
        .with_constant(ConstantDef {
            name: "REPORT_FORMAT_JUNIT".to_string(),
            value: UniversalValue::from(REPORT_FORMAT_JUNIT),
        })
        .with_constant(ConstantDef {
            name: "REPORT_FORMAT_TEXT".to_string(),
            value: UniversalValue::from(REPORT_FORMAT_TEXT),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_true_values_pass() {
        assert(&[UniversalValue::Bool(true)]).unwrap();
    }

    #[test]
    fn assert_falsy_raises_assertion_failed() {
        let err = assert(&[UniversalValue::Bool(false)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssertionFailed);
    }

    #[test]
    fn assert_eq_mismatch_raises_assertion_failed() {
        let err = assert_eq(&UniversalValue::Int(1), &UniversalValue::Int(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssertionFailed);
    }

    #[test]
    fn assert_ne_mismatch_passes() {
        assert_ne(&UniversalValue::Int(1), &UniversalValue::Int(2)).unwrap();
    }

    #[test]
    fn assert_ne_equal_values_raises() {
        let err = assert_ne(&UniversalValue::Int(1), &UniversalValue::Int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssertionFailed);
    }

    #[test]
    fn assert_contains_checks_substrings_members_and_keys() {
        assert_contains(&UniversalValue::from("hello world"), &UniversalValue::from("world")).unwrap();
        assert_contains(&UniversalValue::Array(vec![UniversalValue::Int(1)]), &UniversalValue::Int(1)).unwrap();
        let mut fields = indexmap::IndexMap::new();
        fields.insert("a".to_string(), UniversalValue::Int(1));
        assert_contains(&UniversalValue::Object(fields), &UniversalValue::from("a")).unwrap();
    }

    #[test]
    fn assert_contains_missing_raises() {
        let err = assert_contains(&UniversalValue::from("hello"), &UniversalValue::from("bye")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssertionFailed);
    }

    #[test]
    fn skip_raises_test_skipped() {
        assert_eq!(skip("not ready yet").kind(), ErrorKind::TestSkipped);
    }

    #[test]
    fn fail_raises_assertion_failed() {
        assert_eq!(fail("boom").kind(), ErrorKind::AssertionFailed);
    }

    #[test]
    fn stub_reports_not_wired_up() {
        let err = StubTestCollaborator.run(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn module_exposes_every_expected_function() {
        let module = build_module(Arc::new(StubTestCollaborator));
        for name in [
            "suite",
            "test",
            "before_all",
            "after_all",
            "before_each",
            "after_each",
            "run",
            "run_all",
            "run_with_filter",
            "assert",
            "assert_eq",
            "assert_ne",
            "assert_true",
            "assert_false",
            "assert_nil",
            "assert_not_nil",
            "assert_contains",
            "assert_throws",
            "assert_no_throw",
            "fail",
            "skip",
            "create_mock",
            "create_stub",
            "create_spy",
            "get_results",
            "generate_report",
        ] {
            assert!(module.find_function(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn module_exposes_result_and_report_format_constants() {
        let module = build_module(Arc::new(StubTestCollaborator));
        assert_eq!(module.constants.len(), 7);
    }
}
