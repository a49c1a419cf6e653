use dioxus::prelude::*;
use dioxus_router::Link;

use crate::routes::Route;

#[component]
pub fn NotFoundView(segments: Vec<String>) -> Element {
    let path = segments.join("/");
    rsx! {
        div { class: "page",
            h2 { class: "view-title", "Page not found" }
            p { "Nothing lives at /{path}." }
            Link { class: "btn btn-secondary", to: Route::Home {}, "Back to all lessons" }
        }
    }
}
