//! Navigation card used on the landing page.

use leptos::prelude::*;

/// A clickable card linking to one of the workspace tools.
#[component]
pub fn LinkCard(href: &'static str, title: &'static str, description: &'static str) -> impl IntoView {
    view! {
        <a class="link-card" href=href>
            <h2 class="link-card__title">{title}</h2>
            <p class="link-card__description">{description}</p>
        </a>
    }
}
