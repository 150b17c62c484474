//! Leptos views for the APEIRON-X web front end.
//!
//! With the `ssr` feature the server crate renders these views to HTML;
//! without it they compile for plain rendering in tests.

pub mod components;
pub mod pages;
