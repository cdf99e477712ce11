//! # custom-scss core
//!
//! Shared, WASM-safe logic for custom-scss: document models, the SCSS
//! compiler adapter, the store abstraction, mode selection, the value
//! resolution protocol and the live preview bridge.
//!
//! This crate contains no tokio, sqlx, or other native-only dependencies.
//! The only filesystem access is `@use` / `@import` resolution, and only
//! when the compiler is given load paths.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `Document`, `Mode`, `DraftOverlay`, `Revision` |
//! | [`error`] | `CompileError`, `ConfigurationError`, `StoreError`, `CommitError` |
//! | [`compiler`] | `Compiler` trait and the `grass`-backed implementation |
//! | [`store`] | `Store` trait and in-memory backend |
//! | [`mode`] | Mode settings trait and precedence resolution |
//! | [`resolve`] | Load, live-preview and commit paths |
//! | [`preview`] | Change notifications to render surface |

pub mod compiler;
pub mod error;
pub mod mode;
pub mod models;
pub mod preview;
pub mod resolve;
pub mod store;
