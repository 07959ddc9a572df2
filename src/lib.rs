#![doc(test(attr(deny(warnings))))]

//! Smart Finance core: sessions, a per-identity ledger of accounts and
//! transactions with a live document store or local demo data, dashboard
//! summaries, and generative financial advice with fixed fallbacks.

pub mod advisory;
pub mod app;
pub mod config;
pub mod confirm;
pub mod core;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod session;
pub mod storage;
pub mod utils;

pub use app::App;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Smart Finance tracing initialized.");
    });
}
