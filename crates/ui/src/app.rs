use dioxus::prelude::*;
use dioxus_router::Router;

use crate::context::use_ui_state_provider;
use crate::routes::Route;

#[component]
pub fn App() -> Element {
    use_ui_state_provider();

    rsx! {
        document::Stylesheet { href: asset!("/assets/style.css") }

        // Stable OS/window title; lesson titles are rendered inside the content pane.
        document::Title { "Codify - Learn Python" }

        div { class: "app-root",
            ErrorBoundary {
                handle_error: |errors: ErrorContext| rsx! {
                    div { class: "fatal",
                        h1 { "Something went wrong" }
                        pre { "{errors:?}" }
                    }
                },
                Router::<Route> {}
            }
        }
    }
}
