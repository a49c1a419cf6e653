use dioxus::prelude::*;
use dioxus_router::Link;

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::{use_progress, view_state_from_resource};
use crate::vm::inline_markdown_to_html;

#[component]
pub fn HomeView() -> Element {
    let ctx = use_context::<AppContext>();
    let catalog = ctx.catalog();
    let state = view_state_from_resource(use_progress());
    let progress = state.ready();

    let next_lesson = catalog
        .iter()
        .find(|lesson| !progress.is_some_and(|progress| progress.is_complete(&lesson.id())))
        .or_else(|| catalog.first());

    let cards = catalog.iter().enumerate().map(|(index, lesson)| {
        let lesson_id = lesson.id_str().to_string();
        let done = progress.is_some_and(|progress| progress.is_complete(&lesson.id()));
        let number = index + 1;
        let takeaway = inline_markdown_to_html(lesson.key_takeaway());
        rsx! {
            li { key: "{lesson_id}", class: if done { "lesson-card lesson-card--done" } else { "lesson-card" },
                div { class: "lesson-card-header",
                    span { class: "lesson-card-number", "Lesson {number}" }
                    if done {
                        span { class: "lesson-card-badge", "Completed" }
                    }
                }
                h3 { class: "lesson-card-title", "{lesson.title()}" }
                p { class: "lesson-card-body", dangerous_inner_html: "{takeaway}" }
                Link { class: "btn btn-secondary", to: Route::Lesson { lesson_id: lesson_id.clone() },
                    if done { "Review" } else { "Open" }
                }
            }
        }
    });

    rsx! {
        div { class: "page home-page",
            header { class: "view-header",
                h2 { class: "view-title", "Welcome to Codify" }
                p { class: "view-subtitle",
                    "Read a short explanation, try the example, then write and run your own Python right here."
                }
            }
            div { class: "view-divider" }
            if let Some(lesson) = next_lesson {
                Link {
                    class: "btn btn-primary",
                    to: Route::Lesson { lesson_id: lesson.id_str().to_string() },
                    "Continue with {lesson.plain_title()}"
                }
            }
            ul { class: "lesson-cards", {cards} }
        }
    }
}
