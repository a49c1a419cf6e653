use std::sync::Arc;

use codify_core::Progress;
use dioxus::prelude::*;
use dioxus_router::Link;

use crate::context::{AppContext, UiState};
use crate::routes::Route;
use crate::views::{ViewError, ViewState, use_progress, view_state_from_resource};
use crate::vm::map_sidebar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResetState {
    Idle,
    Resetting,
    Done,
    Error(ViewError),
}

#[component]
pub fn Sidebar() -> Element {
    let ctx = use_context::<AppContext>();
    let ui = use_context::<UiState>();
    let progress_service = ctx.progress();
    let reset_state = use_signal(|| ResetState::Idle);
    let resource = use_progress();

    let state = view_state_from_resource(resource);
    let progress = state.ready().cloned().unwrap_or_else(Progress::new);
    let vm = map_sidebar(ctx.catalog(), &progress);
    let percent = vm.percent();
    let summary = vm.summary_label();

    let links = vm.links.iter().map(|link| {
        let lesson_id = link.id.to_string();
        rsx! {
            li { key: "{lesson_id}",
                Link {
                    class: "lesson-link",
                    active_class: "lesson-link--active",
                    to: Route::Lesson { lesson_id: lesson_id.clone() },
                    span { class: "lesson-link-icon", "{link.icon}" }
                    span { class: "lesson-link-label", "{link.label}" }
                }
            }
        }
    });

    rsx! {
        nav { class: "sidebar",
            Link { class: "sidebar-brand", to: Route::Home {},
                h1 { "🎓 Codify" }
            }
            p { class: "sidebar-tagline", "Your interactive journey into Python." }
            div { class: "sidebar-divider" }

            h3 { "Your Progress" }
            match state {
                ViewState::Loading => rsx! {
                    p { class: "progress-label", "Loading progress..." }
                },
                ViewState::Error(err) => rsx! {
                    p { class: "progress-label", "{err.message()}" }
                },
                ViewState::Ready(_) => rsx! {
                    div { class: "progress-track",
                        div { class: "progress-fill", style: "width: {percent}%;" }
                    }
                    p { class: "progress-label", "{summary}" }
                },
            }
            div { class: "sidebar-divider" }

            ul { class: "lesson-list", {links} }
            div { class: "sidebar-divider" }

            button {
                class: "btn btn-secondary",
                r#type: "button",
                disabled: reset_state() == ResetState::Resetting,
                onclick: move |_| {
                    let progress = Arc::clone(&progress_service);
                    let mut reset_state = reset_state;
                    reset_state.set(ResetState::Resetting);
                    spawn(async move {
                        match progress.reset_all().await {
                            Ok(()) => {
                                reset_state.set(ResetState::Done);
                                ui.progress_changed();
                            }
                            Err(err) => reset_state.set(ResetState::Error(err.into())),
                        }
                    });
                },
                "Reset All Progress"
            }
            match reset_state() {
                ResetState::Done => rsx! {
                    p { class: "callout callout--success", "Progress cleared!" }
                },
                ResetState::Error(err) => rsx! {
                    p { class: "callout callout--error", "{err.message()}" }
                },
                ResetState::Idle | ResetState::Resetting => rsx! {},
            }
        }
    }
}
