//! Yes/no decision points for destructive operations.

use dialoguer::{theme::ColorfulTheme, Confirm};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Answers a yes/no question before a destructive change.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirmer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Asks on the terminal. Any prompt failure counts as "no".
///
/// The prompt blocks the calling thread until answered. On a multi-thread
/// Tokio runtime it runs under `block_in_place` so other tasks keep going;
/// on a current-thread runtime every other task waits for the answer.
pub struct DialoguerConfirmer {
    theme: ColorfulTheme,
}

impl DialoguerConfirmer {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    fn ask(&self, prompt: &str) -> bool {
        match Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(error = %err, "confirmation prompt failed; treating as declined");
                false
            }
        }
    }
}

impl Default for DialoguerConfirmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirmer for DialoguerConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        if can_block_in_place() {
            tokio::task::block_in_place(|| self.ask(prompt))
        } else {
            self.ask(prompt)
        }
    }
}

fn can_block_in_place() -> bool {
    Handle::try_current()
        .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
        .unwrap_or(false)
}
