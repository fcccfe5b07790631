use crate::{Settings, TestInvocationWrapper, UnitOutcome};
use std::convert::Infallible;
use std::fmt;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn wrapper(show_locals: bool) -> TestInvocationWrapper {
    TestInvocationWrapper::new().with_settings(Settings::default().show_locals(show_locals))
}

fn report_of<T: fmt::Debug, E: fmt::Debug>(outcome: UnitOutcome<T, E>) -> String {
    match outcome {
        UnitOutcome::SoftFailed(failure) => failure.report().to_string(),
        other => panic!("expected failed assumptions, got {:?}", other),
    }
}

#[test]
fn test_passing_assume() {
    let outcome = wrapper(false).invoke(|_| {
        assume!(1 == 1);
        Ok::<_, Infallible>(())
    });
    assert!(outcome.is_passed());
}

#[test]
fn test_failing_assume() {
    init_tracing();
    let line = line!() + 2;
    let outcome = wrapper(false).invoke(|_| {
        assume!(1 == 2);
        Ok::<_, Infallible>(())
    });

    let report = report_of(outcome).replace(&format!(":{}:", line), ":LINE:");
    insta::assert_debug_snapshot!(
        report,
        @r###""\n1 Failed Assumptions:\nsrc/tests.rs:LINE: AssumptionFailure\n>>\tassume!(1 == 2);""###
    );
}

#[test]
fn test_multi_pass_two_failing() {
    let outcome = wrapper(false).invoke(|_| {
        assume!("abcdefghijklmnopqrstuvwxyz".contains("xyz"));
        assume!(2 == 2);
        assume!(1 == 2);
        assume!("abcd".contains("xyz"));
        Ok::<_, Infallible>(())
    });

    let report = report_of(outcome);
    assert!(report.contains("2 Failed Assumptions"));
    let first = report.find("assume!(1 == 2);").unwrap();
    let second = report.find("assume!(\"abcd\".contains(\"xyz\"));").unwrap();
    assert!(first < second);
}

#[test]
fn test_passing_assume_does_not_cloak_panic() {
    let outcome = wrapper(false).invoke(|_| -> Result<(), Infallible> {
        assume!(1 == 1);
        assert_eq!(1, 2);
        Ok(())
    });

    match outcome {
        UnitOutcome::HardFailed(crate::HardFailure::Panic(panic)) => {
            assert!(panic.message().contains("left"));
            assert!(panic.message().contains("right"));
        }
        other => panic!("expected the original panic, got {:?}", other),
    }
}

#[test]
fn test_failing_assume_does_not_cloak_panic() {
    init_tracing();
    let outcome = wrapper(false).invoke(|_| -> Result<(), Infallible> {
        assume!(1 == 2);
        assert_eq!(1, 2);
        Ok(())
    });

    let report = report_of(outcome);
    assert!(report.starts_with("\nOriginal Failure: \n>> panicked at src/tests.rs:"));
    assert!(report.contains("left"));
    assert!(report.contains("1 Failed Assumptions:"));
    assert!(report.find("Original Failure").unwrap() < report.find("1 Failed Assumptions").unwrap());
}

#[test]
fn test_original_failure_keeps_nested_location() {
    fn failing_func() {
        assert!(false, "inner failure");
    }
    let failing_line = line!() - 2;

    let outcome = wrapper(false).invoke(|_| -> Result<(), Infallible> {
        assume!(1 == 2);
        failing_func();
        Ok(())
    });

    let report = report_of(outcome);
    assert!(report.contains(&format!("panicked at src/tests.rs:{}:9: inner failure", failing_line)));
}

#[test]
fn test_message_is_in_output() {
    let outcome = wrapper(false).invoke(|_| {
        let a = 1;
        let b = 2;
        assume!(a == b, "a:{} b:{}", a, b);
        Ok::<_, Infallible>(())
    });

    let report = report_of(outcome);
    assert!(report.contains(">>\ta:1 b:2"));
    assert!(!report.contains("assume!(a == b"));
}

#[test]
fn test_empty_message_falls_back_to_source() {
    let outcome = wrapper(false).invoke(|_| {
        crate::assume(false, "");
        Ok::<_, Infallible>(())
    });

    assert!(report_of(outcome).contains(">>\tcrate::assume(false, \"\");"));
}

#[test]
fn test_with_locals() {
    let line = line!() + 4;
    let outcome = wrapper(true).invoke(|_| {
        let a = 1;
        let b = 2;
        assume!(a == b; a, b);
        Ok::<_, Infallible>(())
    });

    let report = report_of(outcome).replace(&format!(":{}:", line), ":LINE:");
    insta::assert_debug_snapshot!(
        report,
        @r###""\n1 Failed Assumptions:\nsrc/tests.rs:LINE: AssumptionFailure\n>>\tassume!(a == b; a, b);\nLocals:\n\ta          = 1\n\tb          = 2\n\n""###
    );
}

#[test]
fn test_with_locals_enabled_but_none_listed() {
    let outcome = wrapper(true).invoke(|_| {
        let a = 1;
        let b = 2;
        assume!(a == b);
        Ok::<_, Infallible>(())
    });

    let report = report_of(outcome);
    assert!(report.ends_with(">>\tassume!(a == b);"));
    assert!(!report.contains("Locals:"));
}

#[test]
fn test_without_locals() {
    let outcome = wrapper(false).invoke(|_| {
        let a = 1;
        let b = 2;
        assume!(a == b; a, b);
        Ok::<_, Infallible>(())
    });

    let report = report_of(outcome);
    assert!(report.contains("1 Failed Assumptions"));
    assert!(!report.contains("a          = 1"));
    assert!(!report.contains("b          = 2"));
    assert!(!report.contains("Locals:"));
}

#[test]
fn test_message_and_locals() {
    let outcome = wrapper(true).invoke(|_| {
        let status = 404;
        assume!(status == 200, "status was {}", status; status);
        Ok::<_, Infallible>(())
    });

    let report = report_of(outcome);
    assert!(report.contains(">>\tstatus was 404\nLocals:\n\tstatus     = 404"));
}

#[test]
fn test_assume_returns_condition() {
    let outcome = wrapper(false).invoke(|_| {
        let found = Some(3);
        if assume!(found) {
            assume!(found == Some(4));
        }
        let parsed: Result<u8, _> = "x".parse::<u8>();
        let ok = assume!(&parsed);
        Ok::<_, Infallible>(ok)
    });

    let report = report_of(outcome);
    assert!(report.contains("2 Failed Assumptions"));
    assert!(report.contains("assume!(found == Some(4));"));
    assert!(report.contains("assume!(&parsed);"));
}

#[test]
fn test_unicode_and_bytes() {
    let outcome = wrapper(false).invoke(|_| {
        assume!(b"\x01" == b"\x5b");
        assume!("\u{5b}" == "\u{5a}");
        Ok::<_, Infallible>(())
    });

    let report = report_of(outcome);
    assert!(report.contains("2 Failed Assumptions"));
    assert!(report.contains("assume!(b\"\\x01\" == b\"\\x5b\");"));
}

#[test]
fn test_explicit_context_and_macro_share_buffer() {
    let outcome = wrapper(false).invoke(|cx| {
        cx.check(false, "explicit");
        assume!(false, "macro");
        crate::assume(false, "function");
        assert_eq!(cx.pending(), 3);
        Ok::<_, Infallible>(())
    });

    let failure = match outcome {
        UnitOutcome::SoftFailed(failure) => failure,
        other => panic!("unexpected outcome: {:?}", other),
    };
    let contexts: Vec<&str> = failure.records().iter().map(|r| r.context()).collect();
    assert_eq!(contexts, vec!["explicit", "macro", "function"]);
}

#[test]
fn test_assume_in_helper_reports_helper_line() {
    fn check_positive(value: i32) -> bool {
        assume!(value > 0)
    }
    let helper_line = line!() - 2;

    let outcome = wrapper(false).invoke(|_| {
        check_positive(-1);
        Ok::<_, Infallible>(())
    });

    let failure = match outcome {
        UnitOutcome::SoftFailed(failure) => failure,
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert_eq!(failure.records()[0].location().line, helper_line);
    assert_eq!(failure.records()[0].context(), "assume!(value > 0)");
}

#[test]
fn test_function_name_strips_closures() {
    let name = (|| crate::__function_name!())();
    assert!(name.ends_with("tests::test_function_name_strips_closures"), "{}", name);
}

#[test]
fn test_helper_thread_failure_fails_unit() {
    let outcome = wrapper(false).invoke(|cx| {
        std::thread::scope(|threads| {
            threads.spawn(|| {
                cx.in_thread(|| {
                    assume!(1 == 2, "failed in helper thread");
                })
            });
        });
        assume!(1 == 3, "failed in body");
        Ok::<_, Infallible>(())
    });

    let report = report_of(outcome);
    assert!(report.starts_with("\n2 Failed Assumptions:\n"));
    assert!(report.find(">>\tfailed in helper thread").unwrap() < report.find(">>\tfailed in body").unwrap());
}

#[test]
fn test_parallel_units_do_not_mix() {
    init_tracing();
    let handles: Vec<_> = (0..8)
        .map(|unit| {
            std::thread::spawn(move || {
                let outcome = wrapper(false).invoke(|_| {
                    for i in 0..unit {
                        assume!(false, "unit {} failure {}", unit, i);
                        std::thread::yield_now();
                    }
                    Ok::<_, Infallible>(())
                });
                match outcome {
                    UnitOutcome::Passed(()) => (unit, Vec::new()),
                    UnitOutcome::SoftFailed(failure) => (
                        unit,
                        failure
                            .records()
                            .iter()
                            .map(|r| r.context().to_string())
                            .collect(),
                    ),
                    other => panic!("unexpected outcome: {:?}", other),
                }
            })
        })
        .collect();

    for handle in handles {
        let (unit, contexts) = handle.join().unwrap();
        let expected: Vec<String> = (0..unit)
            .map(|i| format!("unit {} failure {}", unit, i))
            .collect();
        assert_eq!(contexts, expected);
    }
}
