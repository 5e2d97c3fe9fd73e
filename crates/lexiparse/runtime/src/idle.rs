// Lexiparse
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Host idle mechanisms
//!
//! Store mutations from filing are deferred until the host reports it is
//! idle. [`ManualIdleHost`] leaves that decision to the host, which pumps
//! [`ManualIdleHost::run_pending`] from its own loop; [`ThreadIdleHost`] runs
//! deferred work on a dedicated thread as soon as it arrives.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub type IdleTask = Box<dyn FnOnce() + Send + 'static>;

pub trait IdleHost: Send + Sync {
    /// Run `task` the next time the host is idle
    fn run_on_idle(&self, task: IdleTask);

    /// Progress side channel
    fn report_task(&self, description: &str, depth: usize) {
        debug!(description, depth, "parser task");
    }
}

#[derive(Default)]
pub struct ManualIdleHost {
    tasks: Mutex<VecDeque<IdleTask>>,
}

impl ManualIdleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every task queued so far, returning how many ran
    pub fn run_pending(&self) -> usize {
        let tasks: Vec<IdleTask> = self.tasks.lock().drain(..).collect();
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl IdleHost for ManualIdleHost {
    fn run_on_idle(&self, task: IdleTask) {
        self.tasks.lock().push_back(task);
    }
}

impl std::fmt::Debug for ManualIdleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualIdleHost").field("pending", &self.pending()).finish()
    }
}

/// Runs idle work on its own thread
pub struct ThreadIdleHost {
    sender: Mutex<Option<mpsc::UnboundedSender<IdleTask>>>,
    thread: Option<JoinHandle<()>>,
}

impl ThreadIdleHost {
    pub fn spawn() -> std::io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<IdleTask>();
        let thread = thread::Builder::new().name("lexiparse-idle".into()).spawn(move || {
            while let Some(task) = receiver.blocking_recv() {
                task();
            }
            debug!("idle host stopped");
        })?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread: Some(thread),
        })
    }
}

impl IdleHost for ThreadIdleHost {
    fn run_on_idle(&self, task: IdleTask) {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if sender.send(task).is_err() {
                    warn!("idle host thread has exited; task dropped");
                }
            }
            None => warn!("idle host is shut down; task dropped"),
        }
    }
}

impl Drop for ThreadIdleHost {
    fn drop(&mut self) {
        self.sender.lock().take();
        // The last reference can be released by a task on the idle thread itself
        if let Some(thread) = self.thread.take().filter(|t| t.thread().id() != thread::current().id()) {
            if thread.join().is_err() {
                warn!("idle host thread panicked");
            }
        }
    }
}
