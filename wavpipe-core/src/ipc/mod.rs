//! Serialisable types handed to hosts (CLI, GUIs, log shippers).
//!
//! All types derive `serde::Serialize` + `serde::Deserialize`.

pub mod events;
