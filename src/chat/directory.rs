use crate::core::message::{same_name, Server};
use std::sync::{Arc, PoisonError, RwLock};

/// Live view of the servers the client is a member of.
///
/// Written only by the network driver; commands and autocomplete read a
/// snapshot at the moment they need it.
#[derive(Clone, Default)]
pub struct Directory {
    servers: Arc<RwLock<Vec<Server>>>,
}

impl Directory {
    pub fn new(servers: Vec<Server>) -> Self {
        Self {
            servers: Arc::new(RwLock::new(servers)),
        }
    }

    pub fn snapshot(&self) -> Vec<Server> {
        self.servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, servers: Vec<Server>) {
        *self.servers.write().unwrap_or_else(PoisonError::into_inner) = servers;
    }

    pub fn upsert(&self, server: Server) {
        let mut servers = self.servers.write().unwrap_or_else(PoisonError::into_inner);
        match servers
            .iter_mut()
            .find(|existing| same_name(&existing.name, &server.name))
        {
            Some(existing) => *existing = server,
            None => servers.push(server),
        }
    }

    pub fn remove(&self, name: &str) {
        self.servers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|server| !same_name(&server.name, name));
    }
}
