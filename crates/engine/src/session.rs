//! Server-side state of one connection.
//!
//! A [`Client`] is owned by exactly one task at a time: the Universe while the
//! player is in the lobby, a World while they play. It is moved between them
//! through channels, never shared.

use std::fmt;

use delver_domain::{LocationId, Wid, WorldId};
use delver_shared::{Message, Reply, ResultCode};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::infrastructure::ports::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Waiting,
    LoggedIn,
    CharacterSelected,
    InWorld,
}

/// What a drain of the inbound queue produced.
#[derive(Debug, Default)]
pub struct Inbox {
    pub messages: Vec<Message>,
    /// The connection is gone; no more messages will arrive.
    pub disconnected: bool,
}

pub struct Client {
    id: ClientId,
    state: SessionState,
    inbound: mpsc::Receiver<Message>,
    outbound: mpsc::Sender<Message>,
    pub account: Option<Account>,
    /// Name of the selected character.
    pub character: Option<String>,
    /// World id of the character while it is in a location.
    pub wid: Wid,
    pub world: Option<WorldId>,
    pub location: Option<LocationId>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("user", &self.username())
            .field("character", &self.character)
            .field("wid", &self.wid)
            .finish()
    }
}

impl Client {
    pub fn new(
        id: ClientId,
        inbound: mpsc::Receiver<Message>,
        outbound: mpsc::Sender<Message>,
    ) -> Self {
        Self {
            id,
            state: SessionState::Waiting,
            inbound,
            outbound,
            account: None,
            character: None,
            wid: Wid::NONE,
            world: None,
            location: None,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub fn username(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.username.as_str())
    }

    /// Forget the account and character; back to `Waiting`.
    pub fn log_out(&mut self) {
        self.state = SessionState::Waiting;
        self.account = None;
        self.character = None;
        self.leave_world();
    }

    pub fn leave_world(&mut self) {
        self.wid = Wid::NONE;
        self.world = None;
        self.location = None;
    }

    /// Queue a message for the socket writer without waiting.
    ///
    /// Returns `false` once the writer is gone. A full queue drops the message.
    pub fn send(&self, message: Message) -> bool {
        match self.outbound.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                tracing::warn!(client = %self.id, kind = message.kind(), "Outbound queue full, dropping message");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Take the messages queued right now, without waiting for more.
    pub fn drain(&mut self) -> Inbox {
        let mut inbox = Inbox::default();
        // One poll even when empty, so a closed channel is noticed.
        let queued = self.inbound.len().max(1);
        for _ in 0..queued {
            match self.inbound.try_recv() {
                Ok(message) => inbox.messages.push(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    inbox.disconnected = true;
                    break;
                }
            }
        }
        inbox
    }
}

/// The same message answered with `400` and a reason, for requests that are
/// not valid in the client's current state. Messages without a result field
/// get no answer.
pub fn bad_request(message: Message, reason: &str) -> Option<Message> {
    respond(message, ResultCode::BAD_REQUEST, reason)
}

/// Fill in the result of a request payload, keeping its other fields.
pub fn respond(message: Message, code: ResultCode, reason: &str) -> Option<Message> {
    Some(match message {
        Message::Login(data) => Message::Login(data.respond(code, reason)),
        Message::Register(data) => Message::Register(data.respond(code, reason)),
        Message::Logout(data) => Message::Logout(data.respond(code, reason)),
        Message::CreateCharacter(data) => Message::CreateCharacter(data.respond(code, reason)),
        Message::DeleteCharacter(data) => Message::DeleteCharacter(data.respond(code, reason)),
        Message::JoinCharacter(data) => Message::JoinCharacter(data.respond(code, reason)),
        Message::UnjoinCharacter(data) => Message::UnjoinCharacter(data.respond(code, reason)),
        Message::Worlds(data) => Message::Worlds(data.respond(code, reason)),
        Message::CreateWorld(data) => Message::CreateWorld(data.respond(code, reason)),
        Message::JoinWorld(data) => Message::JoinWorld(data.respond(code, reason)),
        Message::Location(data) => Message::Location(data.respond(code, reason)),
        Message::Tile(data) => Message::Tile(data.respond(code, reason)),
        Message::Desire(data) => Message::Desire(data.respond(code, reason)),
        Message::Ping(_)
        | Message::Owner(_)
        | Message::Inventory(_)
        | Message::Skills(_)
        | Message::Event(_)
        | Message::Events(_) => return None,
    })
}
