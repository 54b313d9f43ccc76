/*!
 * Sync Module
 * Wait strategies and the synchronization primitives tasks park on
 */

pub mod primitive;
pub mod strategy;

// Re-export public API
pub use primitive::{CompletionGate, EventGate, SemaphoreGate, SyncPrimitive, WaitOutcome};
pub use strategy::{PrimitiveKind, WaitStrategy};
