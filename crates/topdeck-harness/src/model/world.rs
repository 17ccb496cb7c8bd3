//! Model world.
//!
//! Holds one model participant per slot and exposes the part of their
//! beliefs that can be compared against the real server.

use topdeck_proto::ServerMessage;

use super::{
    client::{ModelClient, ModelViolation},
    operation::ClientId,
};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Room code each slot sits in, by slot
    pub rooms: Vec<Option<String>>,
}

/// All model participants.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    clients: Vec<ModelClient>,
}

impl ModelWorld {
    /// Create a model world with the given number of participant slots.
    pub fn new(num_clients: u8) -> Self {
        Self { clients: (0..num_clients).map(ModelClient::new).collect() }
    }

    /// Number of slots.
    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }

    /// Participant by slot.
    pub fn client(&self, id: ClientId) -> Option<&ModelClient> {
        self.clients.get(usize::from(id))
    }

    /// All participants in slot order.
    pub fn clients(&self) -> &[ModelClient] {
        &self.clients
    }

    /// Feed a message delivered to a slot.
    ///
    /// # Errors
    ///
    /// Returns the violation if the message contradicts the slot's beliefs.
    pub fn observe(&mut self, id: ClientId, message: &ServerMessage) -> Result<(), ModelViolation> {
        match self.clients.get_mut(usize::from(id)) {
            Some(client) => client.observe(message),
            None => Ok(()),
        }
    }

    /// Forget a slot's beliefs after it reconnected.
    pub fn reset(&mut self, id: ClientId) {
        if let Some(client) = self.clients.get_mut(usize::from(id)) {
            client.reset();
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState { rooms: self.clients.iter().map(|c| c.room().map(str::to_owned)).collect() }
    }
}
