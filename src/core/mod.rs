//! Core contracts shared by clients, exec wrappers and the tool router.

pub mod error;
