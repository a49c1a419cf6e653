use codify_core::Catalog;
use sandbox::{RUNTIME_ERROR_MARKER, execute};

#[test]
fn every_reference_solution_passes_its_lesson() {
    let catalog = Catalog::builtin();
    for lesson in catalog.iter() {
        let input = if lesson.id_str() == "intro" { "Sam" } else { "" };
        let output = execute(lesson.solution(), input);
        assert!(
            !output.starts_with(RUNTIME_ERROR_MARKER),
            "{} faulted: {output}",
            lesson.id_str()
        );
        assert!(
            lesson.validate(&output, input),
            "{} rejected its own solution: {output}",
            lesson.id_str()
        );
    }
}

#[test]
fn every_example_runs_cleanly() {
    for lesson in Catalog::builtin().iter() {
        let output = execute(lesson.example_code(), "");
        assert!(
            !output.starts_with(RUNTIME_ERROR_MARKER),
            "{} example faulted: {output}",
            lesson.id_str()
        );
    }
}

#[test]
fn solution_outputs_match_python() {
    let catalog = Catalog::builtin();
    let solution = |id: &str| catalog.get(id).map(|lesson| lesson.solution()).unwrap();

    assert_eq!(
        execute(solution("intro"), "Sam"),
        "What is your name? Hello, Sam!\n"
    );
    assert_eq!(execute(solution("variables"), ""), "The sum is: 25\n");
    assert_eq!(
        execute(solution("data_structures"), ""),
        "The Hitchhiker's Guide to the Galaxy by Douglas Adams was published in 1979.\n"
    );
    assert_eq!(execute(solution("functions"), ""), "The area is: 50\n");

    let control_flow = execute(solution("control_flow"), "");
    let lines: Vec<&str> = control_flow.lines().collect();
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "1 is odd");
    assert_eq!(lines[9], "10 is even");
}

#[test]
fn faulted_runs_never_validate_the_intro() {
    let intro = Catalog::builtin().get("intro").unwrap();
    let output = execute("print('hello', undefined_name)", "Sam");
    assert!(output.starts_with(RUNTIME_ERROR_MARKER));
    assert!(!intro.validate(&output, "Sam"));
}
