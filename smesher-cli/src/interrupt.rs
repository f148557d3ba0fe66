//! Ctrl-C routing.
//!
//! The process installs one Ctrl-C listener for its whole lifetime. While a
//! command that can be interrupted is running, an interrupt cancels that
//! command's token; otherwise it goes to an idle handler chosen by the
//! front-end (the binary exits with status 130).

use futures::{Stream, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::tracing::prelude::*;

/// Exit status of a process ended by SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Hands interrupts to the command currently accepting them.
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    slot: Arc<Mutex<Slot>>,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept interrupts until the returned guard is dropped.
    pub fn arm(&self) -> Armed {
        let token = CancellationToken::new();
        let mut slot = self.slot();
        slot.generation += 1;
        slot.token = Some(token.clone());
        Armed {
            interrupts: self.clone(),
            generation: slot.generation,
            token,
        }
    }

    /// Deliver one interrupt. Returns `false` if no command accepted it.
    pub fn interrupt(&self) -> bool {
        match self.slot().token.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Route Ctrl-C for the rest of the program.
    pub fn listen<F>(&self, on_idle: F) -> JoinHandle<()>
    where
        F: Fn() + Send + 'static,
    {
        let signals = futures::stream::unfold((), |()| async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => Some(((), ())),
                Err(e) => {
                    warn!(error = %e, "Unable to listen for Ctrl-C");
                    None
                }
            }
        });
        tokio::spawn(self.clone().forward(signals, on_idle))
    }

    pub(crate) async fn forward<S, F>(self, signals: S, on_idle: F)
    where
        S: Stream<Item = ()>,
        F: Fn(),
    {
        futures::pin_mut!(signals);
        while signals.next().await.is_some() {
            if self.interrupt() {
                debug!("Interrupted running command");
            } else {
                on_idle();
            }
        }
    }
}

/// A command's claim on interrupts, released on drop.
#[derive(Debug)]
pub struct Armed {
    interrupts: Interrupts,
    generation: u64,
    token: CancellationToken,
}

impl Armed {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Armed {
    fn drop(&mut self) {
        let mut slot = self.interrupts.slot();
        if slot.generation == self.generation {
            slot.token = None;
        }
    }
}
