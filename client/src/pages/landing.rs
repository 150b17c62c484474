//! Landing page with navigation cards for the three workspace tools.
//!
//! SYSTEM CONTEXT
//! ==============
//! Served at `/` by the server crate, rendered to a full HTML document on
//! each request. The card targets are pages of the surrounding system; this
//! crate only links to them.

use leptos::prelude::*;
use leptos::tachys::view::RenderHtml;

use crate::components::link_card::LinkCard;

pub const TITLE: &str = "APEIRON-X";
pub const SUBTITLE: &str = "HPM Mathematical Universe Axiom Verifier";
pub const TAGLINE: &str = "Dynamic Logic–Topology–Tensor Evolution System";

/// Static navigation target shown as a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavLink {
    pub href: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub const LINK_CARDS: [NavLink; 3] = [
    NavLink {
        href: "/hpm-dl-editor",
        title: "HPM-DL Editor",
        description: "Edit and compile HPM-DL source files",
    },
    NavLink {
        href: "/axiom-graph-editor",
        title: "Axiom Graph Editor",
        description: "Visualize and edit axiom graphs",
    },
    NavLink {
        href: "/certificate-viewer",
        title: "Certificate Viewer",
        description: "View existence certificates and proofs",
    },
];

#[component]
pub fn LandingPage() -> impl IntoView {
    view! {
        <main class="landing">
            <h1 class="landing__title">{TITLE}</h1>
            <p class="landing__subtitle">{SUBTITLE}</p>
            <p class="landing__tagline">{TAGLINE}</p>
            <div class="landing__grid">
                {LINK_CARDS
                    .iter()
                    .map(|card| {
                        view! {
                            <LinkCard href=card.href title=card.title description=card.description/>
                        }
                    })
                    .collect_view()}
            </div>
        </main>
    }
}

#[component]
fn LandingShell() -> impl IntoView {
    view! {
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <title>{TITLE}</title>
            </head>
            <body>
                <LandingPage/>
            </body>
        </html>
    }
}

/// Render the landing page as a complete HTML document.
pub fn render_landing() -> String {
    let owner = Owner::new();
    let html = owner.with(|| view! { <LandingShell/> }.to_html());
    format!("<!DOCTYPE html>{html}")
}

#[cfg(test)]
#[path = "landing_test.rs"]
mod tests;
