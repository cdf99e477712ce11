//! # Custom SCSS
//!
//! Custom stylesheets that can be written either as plain CSS or as SCSS.
//!
//! Every document keeps two representations side by side: the source the
//! author wrote and the CSS that is actually served. SCSS is compiled once
//! on save, so page loads never pay for compilation, while editors still
//! see and edit their original source. Drafts can be previewed live without
//! being saved; a draft that does not compile falls back to the last saved
//! CSS instead of breaking the page.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────┐
//! │  Editor  │──▶│  Resolver  │──▶│    SQLite    │
//! │  drafts  │   │ mode+grass │   │ docs+history │
//! └──────────┘   └─────┬──────┘   └──────────────┘
//!                      │
//!            ┌─────────┴─────────┐
//!            ▼                   ▼
//!       ┌──────────┐       ┌──────────┐
//!       │   CLI    │       │   HTTP   │
//!       │(scssctl) │       │ SSE push │
//!       └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! scssctl init                                   # create database
//! scssctl save site --file custom.scss --mode scss
//! scssctl css site                               # effective CSS
//! scssctl preview site --file draft.scss         # resolve without saving
//! scssctl serve                                  # start preview server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite document store and mode settings |
//! | [`app`] | Resolver wiring shared by CLI and server |
//! | [`get`] | Read-only commands (`css`, `source`, `history`) |
//! | [`save`] | Commit from the command line |
//! | [`preview`] | Draft preview from the command line |
//! | [`mode_cmd`] | Inspect and set the document mode |
//! | [`server`] | HTTP preview server |
//!
//! The protocol itself (compiler adapter, store trait, mode selection,
//! value resolution, preview bridge) lives in [`custom_scss_core`], which
//! is re-exported from this crate.

pub use custom_scss_core;

pub mod app;
pub mod config;
pub mod db;
pub mod get;
pub mod migrate;
pub mod mode_cmd;
pub mod preview;
pub mod save;
pub mod server;
pub mod sqlite_store;
