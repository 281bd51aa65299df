//! Dialog channel over the coordination server's mailboxes.

use mutiny_core::DialogChannel;
use mutiny_protocol::WorldClient;
use mutiny_types::ActorId;

/// Carries rebellion traffic through `DIALOG_SEND` and `DIALOG_REQ`.
#[derive(Debug, Clone)]
pub struct DialogLink {
    client: WorldClient,
}

impl DialogLink {
    /// Wrap a client session.
    pub const fn new(client: WorldClient) -> Self {
        Self { client }
    }
}

impl DialogChannel for DialogLink {
    async fn send(&self, to: &ActorId, text: &str) -> bool {
        self.client.send_dialog(to.as_str(), text).await
    }

    async fn receive(&self, from: &ActorId) -> Vec<String> {
        self.client
            .dialogs(Some(from.as_str()))
            .await
            .into_iter()
            .map(|msg| msg.text)
            .collect()
    }
}
