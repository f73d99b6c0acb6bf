#![allow(dead_code)]

use std::time::Duration;

use substate::Observer;
use tokio::sync::watch;

/// Records the name of every state a machine enters.
#[derive(Debug)]
pub struct Recorder {
    entered: watch::Sender<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            entered: watch::Sender::new(Vec::new()),
        }
    }

    pub fn entered(&self) -> Vec<String> {
        self.entered.borrow().clone()
    }

    /// Waits until at least `n` states have been entered and returns them.
    pub async fn wait_for_entries(&self, n: usize) -> Vec<String> {
        let mut rx = self.entered.subscribe();
        let wait = rx.wait_for(|entered| entered.len() >= n);
        let seen = match tokio::time::timeout(Duration::from_secs(5), wait).await {
            Ok(Ok(entered)) => Some(entered.clone()),
            _ => None,
        };
        seen.unwrap_or_else(|| panic!("timed out waiting for {n} states, saw {:?}", self.entered()))
    }
}

impl Observer for Recorder {
    fn state_entered(&self, _machine: &str, state: &str) {
        self.entered.send_modify(|entered| entered.push(state.to_owned()));
    }
}
