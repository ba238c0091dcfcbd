//! Edge-triggered tracking of GPU compute processes.

use ahash::AHashSet as HashSet;
use std::fmt;

use crate::record::ProcessRecord;

/// A change in the set of running compute processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    Started { pid: u32, name: String },
    Finished { pid: u32 },
}

impl fmt::Display for PresenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceEvent::Started { pid, name } => {
                write!(f, "A new GPU process was found executing '{name}' (pid {pid})")
            }
            PresenceEvent::Finished { pid } => {
                write!(f, "GPU process {pid} finished its work")
            }
        }
    }
}

/// Owns the set of pids currently considered running.
///
/// Insertion order is kept so `Finished` events come out in the order the
/// processes were first seen.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    active: Vec<u32>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_pids(&self) -> &[u32] {
        &self.active
    }

    /// Diffs `observed` against the active set and updates it.
    ///
    /// Returns `Started` events in observed order followed by `Finished`
    /// events in active-set order. An unchanged observation yields nothing.
    pub fn reconcile(&mut self, observed: &[ProcessRecord]) -> Vec<PresenceEvent> {
        let observed_pids: HashSet<u32> = observed.iter().map(|p| p.pid).collect();
        let previous: Vec<u32> = self.active.clone();
        let mut known: HashSet<u32> = previous.iter().copied().collect();
        let mut events = Vec::new();

        for proc in observed {
            // One process on two GPUs is listed twice; report it once.
            if known.insert(proc.pid) {
                events.push(PresenceEvent::Started {
                    pid: proc.pid,
                    name: proc.process_name.clone(),
                });
                self.active.push(proc.pid);
            }
        }

        for pid in previous.iter().filter(|pid| !observed_pids.contains(pid)) {
            events.push(PresenceEvent::Finished { pid: *pid });
        }
        self.active.retain(|pid| observed_pids.contains(pid));

        events
    }
}
