use std::time::{Duration, Instant};

use sandbox::{FaultKind, Limits, RUNTIME_ERROR_MARKER, Sandbox, dedent, execute};

fn fault_kind(source: &str) -> Option<FaultKind> {
    Sandbox::default()
        .run(source, "")
        .fault()
        .map(|fault| fault.kind())
}

#[test]
fn disallowed_builtins_are_not_defined() {
    for name in ["open", "__import__", "eval", "exec", "globals", "getattr", "type"] {
        let output = execute(&format!("{name}('x')"), "");
        assert_eq!(
            output,
            format!("{RUNTIME_ERROR_MARKER}\nNameError: name '{name}' is not defined (line 1)")
        );
    }
}

#[test]
fn imports_fail_when_executed() {
    assert_eq!(fault_kind("import os"), Some(FaultKind::ImportError));
    assert_eq!(fault_kind("from os import path"), Some(FaultKind::ImportError));
    // Code before the import still runs.
    let result = Sandbox::default().run("print('start')\nimport sys", "");
    assert_eq!(result.output(), "start\n");
}

#[test]
fn dunder_attributes_are_unreachable() {
    assert_eq!(fault_kind("print(''.__class__)"), Some(FaultKind::AttributeError));
    assert_eq!(fault_kind("x = [1].__len__()"), Some(FaultKind::AttributeError));
    assert_eq!(fault_kind("print((1).real)"), Some(FaultKind::AttributeError));
}

#[test]
fn unsupported_constructs_are_syntax_errors() {
    for source in [
        "class A:\n    pass",
        "try:\n    pass\nexcept:\n    pass",
        "f = lambda x: x",
        "with x:\n    pass",
        "x = 1 | 2",
    ] {
        assert_eq!(fault_kind(source), Some(FaultKind::SyntaxError), "{source}");
    }
}

#[test]
fn runs_do_not_share_state() {
    let first = execute("counter = 41\nprint(counter + 1)", "");
    assert_eq!(first, "42\n");
    let second = execute("print(counter)", "");
    assert!(second.starts_with(RUNTIME_ERROR_MARKER), "{second}");
    assert!(second.contains("NameError"), "{second}");
}

#[test]
fn indented_sources_run_like_dedented_ones() {
    let indented = "    total = 0\n    for i in range(4):\n        total += i\n\n    print(total)\n";
    assert_eq!(execute(indented, ""), execute(&dedent(indented), ""));
    assert_eq!(execute(indented, ""), "6\n");
}

#[test]
fn infinite_loops_hit_the_time_budget() {
    let sandbox = Sandbox::new(Limits::default().with_time_budget(Duration::from_millis(200)));
    let started = Instant::now();
    let result = sandbox.run("while True:\n    pass", "");
    assert_eq!(result.fault().map(|f| f.kind()), Some(FaultKind::TimeoutError));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn step_budget_stops_busy_loops() {
    let sandbox = Sandbox::new(Limits::default().with_max_steps(10_000));
    let result = sandbox.run("n = 0\nwhile n < 1000000:\n    n += 1", "");
    assert_eq!(result.fault().map(|f| f.kind()), Some(FaultKind::TimeoutError));
}

#[test]
fn runaway_recursion_is_contained() {
    let output = execute("def down(n):\n    return down(n + 1)\n\ndown(0)", "");
    assert!(output.starts_with(RUNTIME_ERROR_MARKER), "{output}");
    assert!(output.contains("RecursionError"), "{output}");
}

#[test]
fn huge_collections_are_refused() {
    assert_eq!(fault_kind("x = [0] * 10000000"), Some(FaultKind::MemoryError));
    assert_eq!(fault_kind("x = 'ab' * 10000000"), Some(FaultKind::MemoryError));
    assert_eq!(fault_kind("x = list(range(10000000))"), Some(FaultKind::MemoryError));
}

#[test]
fn deeply_nested_expressions_fail_cleanly() {
    let source = format!("x = {}1{}", "(".repeat(5000), ")".repeat(5000));
    assert_eq!(fault_kind(&source), Some(FaultKind::SyntaxError));
}

#[test]
fn integer_overflow_is_a_fault() {
    assert_eq!(fault_kind("print(2 ** 100)"), Some(FaultKind::OverflowError));
}

fn nested(kind: &str, depth: usize) -> String {
    format!("{kind} = ()\nfor i in range({depth}):\n    {kind} = ({kind},)\n")
}

#[test]
fn deeply_nested_tuples_print_without_crashing() {
    let sandbox = Sandbox::new(Limits::default().with_time_budget(Duration::from_secs(60)));
    let source = format!("{}print(len(str(t)))", nested("t", 300_000));
    let result = sandbox.run(&source, "");
    assert!(!result.is_faulted(), "{:?}", result.fault());
    assert_eq!(result.output(), "1503\n");
}

#[test]
fn comparing_deeply_nested_tuples_is_a_recursion_error() {
    let sandbox = Sandbox::new(Limits::default().with_time_budget(Duration::from_secs(60)));
    let setup = format!("{}{}", nested("t", 50_000), nested("u", 50_000));
    for check in ["print(t == u)", "print(t < u)", "print(t in [u])", "d = {t: 1}"] {
        let result = sandbox.run(&format!("{setup}{check}"), "");
        assert_eq!(
            result.fault().map(|f| f.kind()),
            Some(FaultKind::RecursionError),
            "{check}"
        );
    }
}

#[test]
fn long_chains_of_lists_are_released_cleanly() {
    let source = "head = []\nnode = head\nfor i in range(300000):\n    child = []\n    node.append(child)\n    node = child\nprint(len(head))";
    let sandbox = Sandbox::new(Limits::default().with_time_budget(Duration::from_secs(60)));
    let result = sandbox.run(source, "");
    assert!(!result.is_faulted(), "{:?}", result.fault());
    assert_eq!(result.output(), "1\n");
}

#[test]
fn bulk_allocation_loops_hit_the_time_budget() {
    let sandbox = Sandbox::new(
        Limits::default()
            .with_time_budget(Duration::from_millis(200))
            .with_max_allocated(u64::MAX),
    );
    let started = Instant::now();
    let result = sandbox.run("for i in range(300):\n    x = [0] * 999999\n    y = x + x[:1]", "");
    assert_eq!(result.fault().map(|f| f.kind()), Some(FaultKind::TimeoutError));
    assert!(started.elapsed() < Duration::from_secs(5), "{:?}", started.elapsed());
}

#[test]
fn cumulative_allocation_is_bounded() {
    let sandbox = Sandbox::new(Limits::default().with_max_allocated(1_000_000));
    let result = sandbox.run("keep = []\nfor i in range(20):\n    keep.append([0] * 100000)", "");
    assert_eq!(result.fault().map(|f| f.kind()), Some(FaultKind::MemoryError));
    assert_eq!(fault_kind("x = [0] * 1000\ny = x * 3\nprint(len(y))"), None);
}
