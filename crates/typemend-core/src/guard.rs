//! Memory guard: periodic checker re-initialization.
//!
//! Long plans accumulate checker state across hundreds of speculative
//! applies. The guard counts verifications and periodically reloads the host
//! (fresh checker over the current VFS), which leaves committed fixes and
//! any active snapshot untouched.

use crate::host::TypeCheckHost;

pub const DEFAULT_RESET_INTERVAL: usize = 50;

#[derive(Debug)]
pub struct MemoryGuard {
    reset_interval: usize,
    verifications: usize,
    commits: usize,
    reloads: usize,
}

impl MemoryGuard {
    /// `reset_interval == 0` disables reloading.
    pub fn new(reset_interval: usize) -> Self {
        Self {
            reset_interval,
            verifications: 0,
            commits: 0,
            reloads: 0,
        }
    }

    /// Count one verification; reload the host when the interval elapses.
    /// Returns true when a reload happened.
    pub fn after_verification(&mut self, host: &mut dyn TypeCheckHost) -> bool {
        self.verifications += 1;
        if self.reset_interval > 0 && self.verifications % self.reset_interval == 0 {
            host.reload();
            self.reloads += 1;
            tracing::debug!(
                verifications = self.verifications,
                reloads = self.reloads,
                "reloaded checker state"
            );
            return true;
        }
        false
    }

    pub fn after_commit(&mut self) {
        self.commits += 1;
    }

    pub fn verifications(&self) -> usize {
        self.verifications
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn reloads(&self) -> usize {
        self.reloads
    }
}
