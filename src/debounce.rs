use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::controller::lock_unpoisoned;

/// Quiet window for keyboard-triggered sends.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

struct DebounceState<T> {
    generation: u64,
    pending: Option<T>,
}

/// Trailing-edge debouncer: rapid calls within the window collapse into
/// one invocation carrying the arguments of the last call. The timer
/// resets on every call.
///
/// Intended for keyboard-triggered sends only; explicit button actions
/// should invoke their target directly.
pub struct Debouncer<T: Send + 'static> {
    window: Duration,
    state: Arc<Mutex<DebounceState<T>>>,
    action: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(action: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self::with_window(DEFAULT_DEBOUNCE_WINDOW, action)
    }

    pub fn with_window(window: Duration, action: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            window,
            state: Arc::new(Mutex::new(DebounceState {
                generation: 0,
                pending: None,
            })),
            action: Arc::new(action),
        }
    }

    /// Record a trigger. Must be called from within a tokio runtime.
    pub fn call(&self, args: T) {
        let generation = {
            let mut state = lock_unpoisoned(&self.state);
            state.generation += 1;
            state.pending = Some(args);
            state.generation
        };

        let state = Arc::clone(&self.state);
        let action = Arc::clone(&self.action);
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let args = {
                let mut state = lock_unpoisoned(&state);
                if state.generation != generation {
                    // A newer trigger reset the window.
                    return;
                }
                state.pending.take()
            };

            if let Some(args) = args {
                action(args);
            }
        });
    }
}
