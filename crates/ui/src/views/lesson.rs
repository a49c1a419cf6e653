use std::sync::Arc;

use codify_core::{LessonId, SubmissionPhase};
use dioxus::prelude::*;
use dioxus_router::Link;
use services::SubmissionService;

use crate::context::{AppContext, UiState};
use crate::routes::Route;
use crate::views::ViewError;
use crate::vm::{feedback_for, map_lesson_page, merge_finished_session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LessonAction {
    Run,
    Submit,
}

type ActionError = Signal<Option<(LessonId, ViewError)>>;

#[component]
pub fn LessonView(lesson_id: String) -> Element {
    let ctx = use_context::<AppContext>();
    let ui = use_context::<UiState>();
    let action_error: ActionError = use_signal(|| None);

    let Some(lesson) = ctx.catalog().get(&lesson_id) else {
        return rsx! {
            div { class: "page",
                h2 { class: "view-title", "Lesson not found" }
                p { "There is no lesson called \"{lesson_id}\"." }
                Link { class: "btn btn-secondary", to: Route::Home {}, "Back to all lessons" }
            }
        };
    };

    let vm = map_lesson_page(lesson);
    let session = ui.drafts.read().snapshot(&vm.id);
    let running = session.phase() == SubmissionPhase::Running;
    let feedback = feedback_for(session.phase());
    let error = action_error
        .read()
        .as_ref()
        .filter(|(failed, _)| *failed == vm.id)
        .map(|(_, err)| *err);

    let mut drafts = ui.drafts;
    let code_id = vm.id.clone();
    let input_id = vm.id.clone();
    let run_id = vm.id.clone();
    let submit_id = vm.id.clone();
    let run_service = ctx.submissions();
    let submit_service = ctx.submissions();

    rsx! {
        div { class: "page lesson-page",
            header { class: "view-header",
                h2 { class: "view-title", "{vm.title}" }
            }

            section { class: "panel",
                h3 { "📖 Explanation" }
                div { class: "markdown", dangerous_inner_html: "{vm.explanation_html}" }
                div { class: "callout callout--info",
                    strong { "Key Takeaway: " }
                    span { dangerous_inner_html: "{vm.key_takeaway_html}" }
                }
            }

            section { class: "panel",
                h3 { "💡 Example" }
                pre { class: "code-block", code { "{vm.example_code}" } }
            }

            div { class: "view-divider" }
            h2 { "✍️ Your Turn: Interactive Editor" }

            section { class: "panel",
                div { class: "callout callout--info",
                    strong { "Exercise: " }
                    span { dangerous_inner_html: "{vm.exercise_html}" }
                }
                details { class: "disclosure",
                    summary { "Stuck? Click here for a hint!" }
                    div { class: "callout callout--warning",
                        strong { "Hint: " }
                        span { dangerous_inner_html: "{vm.hint_html}" }
                    }
                }

                div { class: "editor-grid",
                    div { class: "editor-column",
                        label { r#for: "code-editor", strong { "Your Python Code" } }
                        textarea {
                            id: "code-editor",
                            class: "code-editor",
                            spellcheck: "false",
                            rows: "14",
                            placeholder: "# Write your Python code here",
                            value: "{session.code()}",
                            oninput: move |evt: FormEvent| {
                                drafts.write().entry(&code_id).set_code(evt.value());
                            },
                        }
                        label { r#for: "simulated-input", strong { "Simulated User Input (if needed)" } }
                        input {
                            id: "simulated-input",
                            class: "text-input",
                            r#type: "text",
                            value: "{session.simulated_input()}",
                            oninput: move |evt: FormEvent| {
                                drafts.write().entry(&input_id).set_simulated_input(evt.value());
                            },
                        }
                        div { class: "editor-actions",
                            button {
                                class: "btn btn-secondary",
                                r#type: "button",
                                disabled: running,
                                onclick: move |_| {
                                    start_action(
                                        LessonAction::Run,
                                        Arc::clone(&run_service),
                                        ui,
                                        run_id.clone(),
                                        action_error,
                                    );
                                },
                                "▶️ Run Code"
                            }
                            button {
                                class: "btn btn-primary",
                                r#type: "button",
                                disabled: running,
                                onclick: move |_| {
                                    start_action(
                                        LessonAction::Submit,
                                        Arc::clone(&submit_service),
                                        ui,
                                        submit_id.clone(),
                                        action_error,
                                    );
                                },
                                "✅ Submit & Mark Complete"
                            }
                        }
                    }
                    div { class: "output-column",
                        strong { "Output" }
                        pre { class: "output", "{session.output()}" }
                    }
                }

                if let Some(message) = feedback.message() {
                    p { class: "{feedback.class()}", "{message}" }
                }
                if let Some(err) = error {
                    p { class: "callout callout--error", "{err.message()}" }
                }

                details { class: "disclosure",
                    summary { "Need help? See the solution" }
                    pre { class: "code-block", code { "{vm.solution}" } }
                }
            }
        }
    }
}

fn start_action(
    action: LessonAction,
    submissions: Arc<SubmissionService>,
    ui: UiState,
    lesson_id: LessonId,
    mut action_error: ActionError,
) {
    let mut drafts = ui.drafts;
    let mut session = drafts.read().snapshot(&lesson_id);
    drafts.write().entry(&lesson_id).begin_run();
    action_error.set(None);

    spawn(async move {
        let outcome = match action {
            LessonAction::Run => submissions.run(&mut session).await.map(|_| false),
            LessonAction::Submit => submissions
                .submit(&mut session)
                .await
                .map(|outcome| outcome.correct),
        };
        match outcome {
            Ok(correct) => {
                merge_finished_session(&mut drafts.write(), session);
                if correct {
                    ui.progress_changed();
                }
            }
            Err(err) => {
                let mut book = drafts.write();
                let current = book.entry(&lesson_id);
                let output = current.output().to_string();
                current.finish_run(output, true);
                drop(book);
                action_error.set(Some((lesson_id, err.into())));
            }
        }
    });
}
