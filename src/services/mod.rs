//! Domain services used by HTTP routes and middleware.
//!
//! ARCHITECTURE
//! ============
//! Service modules own credential and session logic so route handlers can
//! stay focused on form handling and rendering.

pub mod credentials;
pub mod password;
pub mod session;
