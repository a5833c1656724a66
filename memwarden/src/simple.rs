//! Process-global convenience wrapper.
//!
//! The orchestrator is always constructed explicitly by its owner; nothing
//! in the core depends on ambient global state. For call sites that cannot
//! thread an instance through (legacy GUI glue, FFI callbacks), this module
//! offers a thin opt-in global slot layered on top.
//!
//! # Examples
//!
//! ```no_run
//! # use std::sync::Arc;
//! # fn demo(orchestrator: Arc<memwarden::orchestrator::MemoryOrchestrator>) {
//! memwarden::simple::install(orchestrator);
//!
//! if let Some(warden) = memwarden::simple::global() {
//!     let _alerts = warden.active_alerts();
//! }
//! # }
//! ```

use crate::orchestrator::MemoryOrchestrator;
use lazy_static::lazy_static;
use std::sync::{Arc, RwLock};

lazy_static! {
    static ref GLOBAL: RwLock<Option<Arc<MemoryOrchestrator>>> = RwLock::new(None);
}

/// Install an orchestrator as the process-global instance.
///
/// Returns the previously installed instance, if any.
pub fn install(orchestrator: Arc<MemoryOrchestrator>) -> Option<Arc<MemoryOrchestrator>> {
    match GLOBAL.write() {
        Ok(mut slot) => slot.replace(orchestrator),
        Err(poisoned) => poisoned.into_inner().replace(orchestrator),
    }
}

/// The process-global instance, if one is installed.
pub fn global() -> Option<Arc<MemoryOrchestrator>> {
    match GLOBAL.read() {
        Ok(slot) => slot.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Remove and return the process-global instance.
///
/// Does not shut the orchestrator down; the caller decides its fate.
pub fn uninstall() -> Option<Arc<MemoryOrchestrator>> {
    match GLOBAL.write() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}
