//! Reusable UI component modules.

pub mod link_card;
