//! Exit hooks
//!
//! Process-wide registry of callbacks run once when the process shuts down.
//! Whoever owns `main` calls [`run_exit_hooks`] on its way out (end of
//! `main`, signal handler, etc.).

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

type HookFn = Box<dyn FnOnce() + Send>;

/// Registered hooks in registration order
static EXIT_HOOKS: Mutex<Vec<(u64, HookFn)>> = parking_lot::const_mutex(Vec::new());

static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned by [`register`], used to remove the hook again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitHookId(u64);

/// Register `hook` to run at process exit
pub fn register<F>(hook: F) -> ExitHookId
where
    F: FnOnce() + Send + 'static,
{
    let id = NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed);
    EXIT_HOOKS.lock().push((id, Box::new(hook)));
    ExitHookId(id)
}

/// Remove a hook without running it
///
/// Returns false if the hook already ran or was removed.
pub fn unregister(id: ExitHookId) -> bool {
    let mut hooks = EXIT_HOOKS.lock();
    let before = hooks.len();
    hooks.retain(|(hook_id, _)| *hook_id != id.0);
    hooks.len() != before
}

/// Whether `id` is still waiting to run
pub fn is_registered(id: ExitHookId) -> bool {
    EXIT_HOOKS.lock().iter().any(|(hook_id, _)| *hook_id == id.0)
}

/// Number of hooks waiting to run
pub fn pending_count() -> usize {
    EXIT_HOOKS.lock().len()
}

/// Run and drain every registered hook
pub fn run_exit_hooks() {
    // Drain first: hooks may touch the registry themselves
    let hooks: Vec<_> = std::mem::take(&mut *EXIT_HOOKS.lock());
    debug!(count = hooks.len(), "running exit hooks");
    for (_, hook) in hooks {
        hook();
    }
}
