//! Page modules for route-level screens.
//!
//! ARCHITECTURE
//! ============
//! Each page owns its static content and delegates card rendering to
//! `components`.

pub mod landing;
