// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process port implementation.
//!
//! Ports registered with one [`InprocHub`] can be connected without any
//! network: each connection owns a bounded crossbeam channel drained by a
//! dedicated dispatcher thread that feeds the destination's sink. The
//! dispatcher thread plays the role a connection's receive thread plays
//! for a networked carrier — ordering per connection is preserved, and a
//! full channel backpressures exactly one sender.
//!
//! Port names are contended resources: several ports may register the
//! same name, and the hub's [`Election`] decides which one owns it.
//! Connections resolve to the elected owner; closing the owner promotes
//! the next registrant.

use crossbeam::channel::{bounded, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

use super::{Error, ObjectSink, Port, Result, SendTicket};
use crate::config::RuntimeConfig;
use crate::core::Election;

type Delivery<T> = (Arc<T>, Option<String>, SendTicket<T>);

struct Link<T: Default + Clone> {
    peer: Arc<PortNode<T>>,
    tx: Sender<Delivery<T>>,
}

struct NodeState<T: Default + Clone> {
    open: bool,
    sink: Option<Arc<dyn ObjectSink<T>>>,
    outputs: Vec<Link<T>>,
    input_count: usize,
}

/// Shared body of one registered port.
pub struct PortNode<T: Default + Clone> {
    name: String,
    state: Mutex<NodeState<T>>,
}

impl<T: Default + Clone> PortNode<T> {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            state: Mutex::new(NodeState {
                open: true,
                sink: None,
                outputs: Vec::new(),
                input_count: 0,
            }),
        })
    }
}

struct HubShared<T: Default + Clone> {
    election: Election<PortNode<T>>,
    config: Arc<RuntimeConfig>,
}

/// Registry of in-process ports.
///
/// An ordinary value: construct one per domain of ports and hand it to
/// whoever creates them. Dropping the hub does not tear ports down; close
/// them explicitly.
pub struct InprocHub<T: Default + Clone> {
    shared: Arc<HubShared<T>>,
}

impl<T: Default + Clone> Clone for InprocHub<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> InprocHub<T> {
    pub fn new() -> Self {
        Self::with_config(Arc::new(RuntimeConfig::new()))
    }

    pub fn with_config(config: Arc<RuntimeConfig>) -> Self {
        Self {
            shared: Arc::new(HubShared {
                election: Election::new(),
                config,
            }),
        }
    }

    /// Register a port under `name`.
    ///
    /// Registration always succeeds; whether this port *owns* the name is
    /// a separate question answered by [`InprocPort::open`] — the first
    /// registrant wins and keeps the name until it closes.
    pub fn create_port(&self, name: &str) -> InprocPort<T> {
        let node = PortNode::new(name);
        self.shared.election.add(name, &node);
        InprocPort {
            node,
            hub: Arc::clone(&self.shared),
        }
    }

    /// Connect `from`'s output to the elected owner of `to`.
    pub fn connect(&self, from: &InprocPort<T>, to: &str) -> Result<()> {
        let dest = match self.shared.election.elected(to) {
            Some(dest) => dest,
            None => return Err(Error::NoSuchPort(to.to_owned())),
        };
        if !dest.state.lock().open {
            return Err(Error::NoSuchPort(to.to_owned()));
        }

        let (tx, rx) = bounded::<Delivery<T>>(self.shared.config.dispatch_bound());
        {
            let worker_dest = Arc::clone(&dest);
            std::thread::spawn(move || {
                // Per-connection dispatcher: arrival order on this
                // connection is delivery order, and a slow sink throttles
                // only this channel.
                for (payload, envelope, ticket) in rx {
                    let sink = {
                        let state = worker_dest.state.lock();
                        if state.open {
                            state.sink.clone()
                        } else {
                            None
                        }
                    };
                    match sink {
                        Some(sink) => {
                            let delivered = sink.deliver((*payload).clone(), envelope);
                            if !delivered {
                                log::debug!(
                                    "sink of {:?} refused delivery",
                                    worker_dest.name
                                );
                            }
                        }
                        None => log::debug!("dropping delivery to {:?}", worker_dest.name),
                    }
                    // Ticket drops here: the message has departed this
                    // connection's send queue.
                    drop(ticket);
                }
            });
        }

        dest.state.lock().input_count += 1;
        from.node.state.lock().outputs.push(Link { peer: dest, tx });
        Ok(())
    }

    /// Remove the connection from `from` to the port named `to`, if any.
    pub fn disconnect(&self, from: &InprocPort<T>, to: &str) -> Result<()> {
        let link = {
            let mut state = from.node.state.lock();
            match state.outputs.iter().position(|l| l.peer.name == to) {
                Some(index) => state.outputs.remove(index),
                None => return Err(Error::NoSuchPort(to.to_owned())),
            }
        };
        link.peer.state.lock().input_count -= 1;
        // Dropping the sender ends the dispatcher after it drains.
        drop(link.tx);
        Ok(())
    }

    /// The elected owner of `name`, if any port holds it.
    pub fn owner(&self, name: &str) -> Option<Arc<PortNode<T>>> {
        self.shared.election.elected(name)
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for InprocHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One registered in-process port.
pub struct InprocPort<T: Default + Clone> {
    node: Arc<PortNode<T>>,
    hub: Arc<HubShared<T>>,
}

impl<T: Default + Clone> Clone for InprocPort<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Port<T> for InprocPort<T> {
    fn name(&self) -> String {
        self.node.name.clone()
    }

    fn open(&self) -> bool {
        self.node.state.lock().open && self.hub.election.is_elected(&self.node.name, &self.node)
    }

    fn close(&self) {
        let (sink, outputs) = {
            let mut state = self.node.state.lock();
            if !state.open {
                return;
            }
            state.open = false;
            (state.sink.take(), std::mem::take(&mut state.outputs))
        };
        self.hub.election.remove(&self.node.name, &self.node);
        if let Some(sink) = sink {
            sink.port_closed();
        }
        for link in outputs {
            link.peer.state.lock().input_count -= 1;
            // Sender drop lets the dispatcher drain and exit.
        }
    }

    fn set_reader(&self, sink: Arc<dyn ObjectSink<T>>) {
        self.node.state.lock().sink = Some(sink);
    }

    fn dispatch(
        &self,
        payload: Arc<T>,
        envelope: Option<String>,
        ticket: SendTicket<T>,
    ) -> Result<usize> {
        let senders: Vec<Sender<Delivery<T>>> = {
            let state = self.node.state.lock();
            if !state.open {
                return Err(Error::PortClosed);
            }
            state.outputs.iter().map(|l| l.tx.clone()).collect()
        };

        let mut reached = 0;
        for tx in senders {
            // A full channel blocks here: backpressure for this one
            // connection, invisible to the others.
            if tx
                .send((Arc::clone(&payload), envelope.clone(), ticket.clone()))
                .is_ok()
            {
                reached += 1;
            }
        }
        // The original ticket drops on return, releasing the writer hold.
        Ok(reached)
    }

    fn input_count(&self) -> usize {
        self.node.state.lock().input_count
    }

    fn output_count(&self) -> usize {
        self.node.state.lock().outputs.len()
    }
}
