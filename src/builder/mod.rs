//! Checker builder - document model, reducer, sync and persistence.
//!
//! ## Overview
//!
//! A checker is a form-like calculator described by one configuration
//! document: four ordered sequences (fields, constants, operations,
//! displays) plus a title and description. Editing happens in memory through
//! a pure reducer; documents are persisted by an HTTP endpoint backed by
//! SQLite and can be published as immutable snapshots.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────────────────────────┐         ┌───────────────────────────────────┐
//! │ store.rs  (CheckerStore)     │  HTTP   │ server.rs  (axum Router, config)  │
//! │   dispatch ─> reducer.rs     │ ──────> │   └─ api.rs  (GET/PUT /c/{id})    │
//! │   save/load/publish          │ <────── │         │                         │
//! │     └─ client.rs             │         │         v                         │
//! │        (CheckerRemote,       │         │ db.rs  (DbHandle, CheckerDb)      │
//! │         CheckerClient)       │         │         SQLite: checkers,         │
//! └──────────────────────────────┘         │         published_checkers        │
//!                                          └───────────────────────────────────┘
//! ```
//!
//! | Module    | Responsibility                                              |
//! |-----------|-------------------------------------------------------------|
//! | `models`  | `Checker`, `CheckerId`, `Element`, `Sequence`, settings      |
//! | `reducer` | `Action` + pure `reduce()` / `reduce_all()`                  |
//! | `store`   | Owned editing state: dispatch, dirty tracking, sync          |
//! | `client`  | `CheckerRemote` trait, reqwest client with timeout + retry   |
//! | `db`      | SQLite access via `DbHandle` (thin `Arc<Mutex<_>>`)          |
//! | `api`     | Route handlers, `AppState`, `ApiError`                       |
//! | `server`  | Router assembly, listener, graceful shutdown                 |

pub mod api;
pub mod client;
pub mod db;
pub mod models;
pub mod reducer;
pub mod server;
pub mod store;

pub use client::{CheckerClient, CheckerRemote, ClientConfig};
pub use models::{Checker, CheckerId, Element, Sequence, Setting, SettingUpdate};
pub use reducer::{Action, parse_actions, reduce, reduce_all};
pub use store::CheckerStore;
