//! Notifications emitted by the engine to whoever is listening.
//!
//! The graph owns the sending half of an unbounded channel. Sends never block and a listener
//! that has gone away is simply forgotten, so the engine never waits on its observers.

use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// The long-running computations that report progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    Geodesics,
    Centrality,
    Cliques,
    Clustering,
    TriadCensus,
    Generator,
    Layout,
}

/// Derived results that can become available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Distances,
    Prominence(crate::centrality::Index),
    Cliques,
    TriadCensus,
    Reciprocity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A structural mutation happened and every derived result was dropped.
    GraphModified { vertices: usize, edges: usize },
    RelationChanged { index: usize, name: String },
    ComputationStarted { task: Task, total: usize },
    Progress { task: Task, done: usize },
    ComputationFinished { task: Task },
    MetricReady(Metric),
}

/// The sending side held by the graph.
#[derive(Debug, Default)]
pub(crate) struct Notifier {
    sender: Option<Sender<Event>>,
}

impl Clone for Notifier {
    // A cloned graph starts without listeners.
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl Notifier {
    /// Replaces any previous listener with a fresh channel.
    pub(crate) fn subscribe(&mut self) -> Receiver<Event> {
        let (sender, receiver) = mpsc::channel();
        self.sender = Some(sender);
        receiver
    }

    pub(crate) fn emit(&mut self, event: Event) {
        let Some(sender) = &self.sender else {
            return;
        };

        if sender.send(event).is_err() {
            trace!("event listener dropped, detaching");
            self.sender = None;
        }
    }

    pub(crate) fn progress(&mut self, task: Task, done: usize) {
        if self.sender.is_some() {
            self.emit(Event::Progress { task, done });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_listener() {
        let mut notifier = Notifier::default();
        notifier.emit(Event::ComputationFinished { task: Task::Layout });
    }

    #[test]
    fn emit_to_listener() {
        let mut notifier = Notifier::default();
        let events = notifier.subscribe();

        notifier.emit(Event::ComputationStarted {
            task: Task::Cliques,
            total: 3,
        });
        notifier.progress(Task::Cliques, 1);

        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![
                Event::ComputationStarted {
                    task: Task::Cliques,
                    total: 3
                },
                Event::Progress {
                    task: Task::Cliques,
                    done: 1
                }
            ]
        );
    }

    #[test]
    fn dropped_listener_detaches() {
        let mut notifier = Notifier::default();
        drop(notifier.subscribe());

        notifier.emit(Event::MetricReady(Metric::Cliques));
        assert!(notifier.sender.is_none());
    }
}
