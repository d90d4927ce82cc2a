// File: mutebridge-core/src/services/discord/interaction_handle.rs

use std::sync::Arc;

use tokio::sync::Mutex;

use mutebridge_common::models::{IncomingInteraction, InitialResponse, InteractionReply};
use mutebridge_common::traits::InteractionResponder;

use crate::Error;

/// How far an interaction got in its response lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyState {
    pub replied: bool,
    pub deferred: bool,
}

impl ReplyState {
    pub fn is_acknowledged(&self) -> bool {
        self.replied || self.deferred
    }
}

/// An interaction plus the one-shot right to answer it.
///
/// The platform accepts exactly one initial response; after that only edits
/// are allowed. The state lock is held across the network call so two
/// concurrent callers can't both send an initial response.
pub struct InteractionHandle {
    interaction: IncomingInteraction,
    responder: Arc<dyn InteractionResponder>,
    state: Mutex<ReplyState>,
}

impl InteractionHandle {
    pub fn new(interaction: IncomingInteraction, responder: Arc<dyn InteractionResponder>) -> Self {
        Self {
            interaction,
            responder,
            state: Mutex::new(ReplyState::default()),
        }
    }

    pub fn interaction(&self) -> &IncomingInteraction {
        &self.interaction
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.interaction.guild_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.interaction.user_id.as_deref()
    }

    pub async fn state(&self) -> ReplyState {
        *self.state.lock().await
    }

    pub async fn is_acknowledged(&self) -> bool {
        self.state.lock().await.is_acknowledged()
    }

    /// Sends the initial reply.
    pub async fn reply(&self, reply: InteractionReply) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.is_acknowledged() {
            return Err(Error::AlreadyAcknowledged(format!(
                "interaction {} was already answered",
                self.interaction.id
            )));
        }
        self.responder
            .create_response(
                self.interaction.id,
                &self.interaction.token,
                &InitialResponse::Message(reply),
            )
            .await?;
        state.replied = true;
        Ok(())
    }

    /// Acknowledges now and answers later with [`edit_reply`](Self::edit_reply).
    pub async fn defer(&self, ephemeral: bool) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.is_acknowledged() {
            return Err(Error::AlreadyAcknowledged(format!(
                "interaction {} can't be deferred after answering",
                self.interaction.id
            )));
        }
        self.responder
            .create_response(
                self.interaction.id,
                &self.interaction.token,
                &InitialResponse::Deferred { ephemeral },
            )
            .await?;
        state.deferred = true;
        Ok(())
    }

    /// Replaces the existing reply (or fills in a deferred one).
    pub async fn edit_reply(&self, reply: InteractionReply) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if !state.is_acknowledged() {
            return Err(Error::Command(format!(
                "interaction {} has no reply to edit",
                self.interaction.id
            )));
        }
        self.responder.edit_response(&self.interaction.token, &reply).await?;
        state.replied = true;
        Ok(())
    }

    /// Replies if nothing was sent yet, edits otherwise. The choice is made
    /// under the state lock.
    pub async fn reply_or_edit(&self, reply: InteractionReply) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.is_acknowledged() {
            self.responder.edit_response(&self.interaction.token, &reply).await?;
        } else {
            self.responder
                .create_response(
                    self.interaction.id,
                    &self.interaction.token,
                    &InitialResponse::Message(reply),
                )
                .await?;
        }
        state.replied = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mutebridge_common::models::InteractionKind;
    use std::sync::Mutex as StdMutex;
    use twilight_model::id::marker::InteractionMarker;
    use twilight_model::id::Id;

    #[derive(Default)]
    struct RecordingResponder {
        calls: StdMutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl InteractionResponder for RecordingResponder {
        async fn create_response(
            &self,
            _id: Id<InteractionMarker>,
            _token: &str,
            response: &InitialResponse,
        ) -> Result<(), Error> {
            let kind = match response {
                InitialResponse::Message(_) => "reply",
                InitialResponse::Deferred { .. } => "defer",
            };
            self.calls.lock().unwrap().push(kind);
            Ok(())
        }

        async fn edit_response(&self, _token: &str, _reply: &InteractionReply) -> Result<(), Error> {
            self.calls.lock().unwrap().push("edit");
            Ok(())
        }
    }

    fn handle() -> (InteractionHandle, Arc<RecordingResponder>) {
        let responder = Arc::new(RecordingResponder::default());
        let interaction = IncomingInteraction {
            id: Id::new(1),
            token: "tok".into(),
            kind: InteractionKind::Command { name: "quote".into() },
            member_permissions: None,
            guild_id: Some("111111111111".into()),
            user_id: Some("222222222222".into()),
        };
        (InteractionHandle::new(interaction, responder.clone()), responder)
    }

    #[tokio::test]
    async fn second_reply_is_refused() {
        let (h, responder) = handle();
        h.reply(InteractionReply::text("one")).await.unwrap();
        let err = h.reply(InteractionReply::text("two")).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyAcknowledged(_)));
        assert_eq!(*responder.calls.lock().unwrap(), vec!["reply"]);
    }

    #[tokio::test]
    async fn reply_or_edit_edits_after_defer() {
        let (h, responder) = handle();
        h.defer(false).await.unwrap();
        h.reply_or_edit(InteractionReply::text("done")).await.unwrap();
        assert_eq!(*responder.calls.lock().unwrap(), vec!["defer", "edit"]);
        assert!(h.state().await.replied);
    }

    #[tokio::test]
    async fn edit_without_reply_fails() {
        let (h, responder) = handle();
        assert!(h.edit_reply(InteractionReply::text("x")).await.is_err());
        assert!(responder.calls.lock().unwrap().is_empty());
    }
}
