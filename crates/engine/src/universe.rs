//! Universe task: the lobby.
//!
//! Owns the accounts store and every World. Clients outside a world are kept
//! here and polled whenever the transport signals new input, so account
//! mutation only ever happens on this one task.

use std::collections::HashSet;
use std::sync::Arc;

use delver_domain::{Character, Namespaces, Object, WorldId};
use delver_shared::{
    CharacterData, CredentialsData, Message, Reply, ResultCode, WorldData,
    WorldSummary, WorldsData,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::ports::{AccountError, AccountStore};
use crate::session::{bad_request, Client, SessionState};
use crate::world::{World, WorldContext, WorldReport};

const MAX_NAME_LEN: usize = 24;

struct WorldEntry {
    id: WorldId,
    name: String,
    password: String,
    players: usize,
    joins: mpsc::Sender<Client>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WorldEntry {
    fn summary(&self, max_players: usize) -> WorldSummary {
        WorldSummary {
            name: self.name.clone(),
            id: self.id,
            private: !self.password.is_empty(),
            players: self.players,
            max_players,
        }
    }
}

pub struct Universe {
    accounts: Arc<dyn AccountStore>,
    namespaces: Arc<Namespaces>,
    context: WorldContext,
    cancel: CancellationToken,
    lobby: Vec<Client>,
    worlds: Vec<WorldEntry>,
    /// Usernames with a live session, in the lobby or in a world.
    active_users: HashSet<String>,
    reports_tx: mpsc::UnboundedSender<WorldReport>,
    reports: mpsc::UnboundedReceiver<WorldReport>,
}

fn valid_character_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
}

impl Universe {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        namespaces: Arc<Namespaces>,
        context: WorldContext,
        cancel: CancellationToken,
    ) -> Self {
        let (reports_tx, reports) = mpsc::unbounded_channel();
        Self {
            accounts,
            namespaces,
            context,
            cancel,
            lobby: Vec::new(),
            worlds: Vec::new(),
            active_users: HashSet::new(),
            reports_tx,
            reports,
        }
    }

    /// Run until cancelled, then stop every world and wait for them.
    pub async fn run(mut self, mut arrivals: mpsc::Receiver<Client>, check: Arc<Notify>) {
        tracing::info!("Universe started");
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                arrival = arrivals.recv() => match arrival {
                    Some(client) => {
                        tracing::info!(client = %client.id(), "Client connected");
                        self.lobby.push(client);
                        self.check_clients().await;
                    }
                    None => break,
                },
                _ = check.notified() => self.check_clients().await,
                Some(report) = self.reports.recv() => self.handle_report(report).await,
            }
        }

        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        tracing::info!(worlds = self.worlds.len(), "Universe shutting down");
        for world in &self.worlds {
            world.cancel.cancel();
        }
        while !self.worlds.is_empty() {
            match self.reports.recv().await {
                Some(report) => self.handle_report(report).await,
                None => break,
            }
        }
        tracing::info!("Universe stopped");
    }

    /// Drain every lobby client's queued messages.
    async fn check_clients(&mut self) {
        for mut client in std::mem::take(&mut self.lobby) {
            let inbox = client.drain();
            let mut destination = None;
            for message in inbox.messages {
                destination = self.handle_message(&mut client, message).await;
                if destination.is_some() {
                    break;
                }
            }

            if let Some(world) = destination {
                if let Err(client) = self.send_to_world(world, client) {
                    self.lobby.push(client);
                }
                continue;
            }
            if inbox.disconnected {
                self.end_session(&client);
                tracing::info!(client = %client.id(), user = ?client.username(), "Client left the lobby");
                continue;
            }
            self.lobby.push(client);
        }
    }

    fn send_to_world(&mut self, id: WorldId, mut client: Client) -> Result<(), Client> {
        let Some(world) = self.worlds.iter_mut().find(|w| w.id == id) else {
            return Err(client);
        };
        client.world = Some(id);
        match world.joins.try_send(client) {
            Ok(()) => {
                world.players += 1;
                Ok(())
            }
            Err(e) => {
                let mut client = e.into_inner();
                client.world = None;
                client.send(Message::JoinWorld(
                    WorldData {
                        id: Some(id),
                        ..Default::default()
                    }
                    .respond(ResultCode::FORBIDDEN, "World is unavailable."),
                ));
                Err(client)
            }
        }
    }

    async fn save(&self, client: &Client) {
        let Some(account) = client.account.as_ref() else {
            return;
        };
        if let Err(e) = self.accounts.save_account(account).await {
            tracing::error!(user = %account.username, error = %e, "Failed to save account");
        }
    }

    fn end_session(&mut self, client: &Client) {
        if let Some(username) = client.username() {
            self.active_users.remove(username);
        }
    }

    async fn handle_report(&mut self, report: WorldReport) {
        match report {
            WorldReport::Left { world, mut client } => {
                self.leave_world(world);
                self.save(&client).await;
                if client.state() == SessionState::Waiting {
                    self.end_session(&client);
                    client.log_out();
                }
                client.leave_world();
                self.lobby.push(client);
                // Input that arrived during the hand-off is picked up here.
                self.check_clients().await;
            }
            WorldReport::Closed { world, client } => {
                self.leave_world(world);
                self.save(&client).await;
                self.end_session(&client);
                tracing::info!(client = %client.id(), world_id = %world, "Client disconnected in world");
            }
            WorldReport::Stopped { world } => {
                if let Some(index) = self.worlds.iter().position(|w| w.id == world) {
                    let entry = self.worlds.remove(index);
                    if let Err(e) = entry.task.await {
                        tracing::error!(world_id = %world, error = %e, "World task failed");
                    }
                }
                tracing::info!(world_id = %world, "World stopped");
            }
        }
    }

    fn leave_world(&mut self, id: WorldId) {
        if let Some(world) = self.worlds.iter_mut().find(|w| w.id == id) {
            world.players = world.players.saturating_sub(1);
        }
    }

    fn spawn_world(&mut self, name: String, password: String) -> WorldId {
        let id = WorldId::new();
        let (joins_tx, joins) = mpsc::channel(self.context.config.max_players.max(1));
        let cancel = self.cancel.child_token();
        let world = World::new(
            id,
            name.clone(),
            self.context.clone(),
            joins,
            self.reports_tx.clone(),
            StdRng::from_entropy(),
        );
        let task = tokio::spawn(world.run(cancel.clone()));
        tracing::info!(world_id = %id, name = %name, "World created");
        self.worlds.push(WorldEntry {
            id,
            name,
            password,
            players: 0,
            joins: joins_tx,
            cancel,
            task,
        });
        id
    }

    fn starting_inventory(&self, inventory: &[String]) -> Vec<Object> {
        inventory
            .iter()
            .filter_map(|name| {
                let object = self
                    .context
                    .catalog
                    .spawn(self.namespaces.content_id(name));
                if object.is_none() {
                    tracing::warn!(archetype = %name, "Unknown starting item");
                }
                object
            })
            .collect()
    }

    /// Handle one lobby request. Returns the world the client should move to.
    async fn handle_message(&mut self, client: &mut Client, message: Message) -> Option<WorldId> {
        tracing::debug!(client = %client.id(), kind = message.kind(), "Lobby message");
        let state = client.state();
        let logged_in = matches!(
            state,
            SessionState::LoggedIn | SessionState::CharacterSelected
        );

        let reply = match message {
            Message::Ping(_) => Message::ping(),
            Message::Login(data) if state != SessionState::Waiting => {
                Message::Login(data.respond(ResultCode::BAD_REQUEST, "Already logged in."))
            }
            Message::Login(data) => Message::Login(self.login(client, data).await),
            Message::Register(data) if state != SessionState::Waiting => {
                Message::Register(data.respond(ResultCode::BAD_REQUEST, "Already logged in."))
            }
            Message::Register(data) => Message::Register(self.register(data).await),
            Message::Logout(data) if state == SessionState::Waiting => {
                Message::Logout(data.respond(ResultCode::BAD_REQUEST, "Not logged in."))
            }
            Message::Logout(data) => {
                self.end_session(client);
                client.log_out();
                Message::Logout(data.respond(ResultCode::OK, "Logged out."))
            }
            Message::CreateCharacter(data) if !logged_in => Message::CreateCharacter(
                data.respond(ResultCode::BAD_REQUEST, "Not logged in."),
            ),
            Message::CreateCharacter(data) => {
                Message::CreateCharacter(self.create_character(client, data).await)
            }
            Message::DeleteCharacter(data) if !logged_in => Message::DeleteCharacter(
                data.respond(ResultCode::BAD_REQUEST, "Not logged in."),
            ),
            Message::DeleteCharacter(data) => {
                Message::DeleteCharacter(self.delete_character(client, data).await)
            }
            Message::JoinCharacter(data) if !logged_in => {
                Message::JoinCharacter(data.respond(ResultCode::BAD_REQUEST, "Not logged in."))
            }
            Message::JoinCharacter(data) => {
                let exists = client
                    .account
                    .as_ref()
                    .is_some_and(|a| a.character(&data.name).is_some());
                if exists {
                    client.character = Some(data.name.clone());
                    client.set_state(SessionState::CharacterSelected);
                    Message::JoinCharacter(data.respond(ResultCode::OK, "Character selected."))
                } else {
                    Message::JoinCharacter(data.respond(ResultCode::NOT_FOUND, "No such character."))
                }
            }
            Message::UnjoinCharacter(data) if state != SessionState::CharacterSelected => {
                Message::UnjoinCharacter(
                    data.respond(ResultCode::BAD_REQUEST, "No character selected."),
                )
            }
            Message::UnjoinCharacter(data) => {
                client.character = None;
                client.set_state(SessionState::LoggedIn);
                Message::UnjoinCharacter(data.respond(ResultCode::OK, "Character unjoined."))
            }
            Message::Worlds(data) => {
                let max_players = self.context.config.max_players;
                Message::Worlds(
                    WorldsData {
                        worlds: self.worlds.iter().map(|w| w.summary(max_players)).collect(),
                        ..data
                    }
                    .respond(ResultCode::OK, ""),
                )
            }
            Message::CreateWorld(data) if !logged_in => {
                Message::CreateWorld(data.respond(ResultCode::BAD_REQUEST, "Not logged in."))
            }
            Message::CreateWorld(data) if data.name.trim().is_empty() => {
                Message::CreateWorld(data.respond(ResultCode::BAD_REQUEST, "World name is required."))
            }
            Message::CreateWorld(data) => {
                let id = self.spawn_world(data.name.trim().to_string(), data.password);
                Message::CreateWorld(
                    WorldData {
                        name: data.name,
                        id: Some(id),
                        ..Default::default()
                    }
                    .respond(ResultCode::OK, "World created."),
                )
            }
            Message::JoinWorld(data) if state != SessionState::CharacterSelected => {
                Message::JoinWorld(data.respond(ResultCode::BAD_REQUEST, "No character selected."))
            }
            Message::JoinWorld(data) => {
                let max_players = self.context.config.max_players;
                let world = data
                    .id
                    .and_then(|id| self.worlds.iter().find(|w| w.id == id));
                let (code, reason) = match world {
                    None => (ResultCode::NOT_FOUND, "No such world."),
                    Some(w) if w.password != data.password => {
                        (ResultCode::FORBIDDEN, "Wrong password.")
                    }
                    Some(w) if w.players >= max_players => (ResultCode::FORBIDDEN, "World is full."),
                    Some(w) => return Some(w.id),
                };
                Message::JoinWorld(
                    WorldData {
                        password: String::new(),
                        ..data
                    }
                    .respond(code, reason),
                )
            }
            other => bad_request(other, "Join a world first.")?,
        };

        client.send(reply);
        None
    }

    async fn login(&mut self, client: &mut Client, data: CredentialsData) -> CredentialsData {
        let password = data.password.clone();
        let data = CredentialsData {
            password: String::new(),
            ..data
        };
        let account = match self.accounts.account(&data.user).await {
            Ok(account) => account,
            Err(AccountError::NoSuchUser(_)) => {
                return data.respond(ResultCode::NOT_FOUND, "No such user.");
            }
            Err(e) => {
                tracing::error!(user = %data.user, error = %e, "Failed to load account");
                return data.respond(ResultCode::NOT_FOUND, "No such user.");
            }
        };
        if !self.accounts.verify_password(&account, &password).await {
            tracing::info!(user = %data.user, "Login refused");
            return data.respond(ResultCode::FORBIDDEN, "Wrong password.");
        }

        if !self.active_users.insert(account.username.clone()) {
            tracing::info!(user = %data.user, "Login refused, account already in use");
            return data.respond(ResultCode::BAD_REQUEST, "Already logged in elsewhere.");
        }

        tracing::info!(client = %client.id(), user = %data.user, "Logged in");
        let characters = account.character_names();
        client.account = Some(account);
        client.set_state(SessionState::LoggedIn);
        CredentialsData { characters, ..data }.respond(ResultCode::OK, "Welcome.")
    }

    async fn register(&self, data: CredentialsData) -> CredentialsData {
        let password = data.password.clone();
        let data = CredentialsData {
            password: String::new(),
            ..data
        };
        if data.user.trim().is_empty() || password.is_empty() {
            return data.respond(ResultCode::BAD_REQUEST, "Username and password are required.");
        }
        match self.accounts.new_account(&data.user, &password).await {
            Ok(()) => data.respond(ResultCode::OK, "Account created."),
            Err(e) => {
                tracing::warn!(user = %data.user, error = %e, "Registration failed");
                data.respond(ResultCode::NOT_FOUND, e.to_string())
            }
        }
    }

    async fn create_character(&self, client: &mut Client, data: CharacterData) -> CharacterData {
        let Some(account) = client.account.as_mut() else {
            return data.respond(ResultCode::BAD_REQUEST, "Not logged in.");
        };
        if !valid_character_name(&data.name) {
            return data.respond(ResultCode::BAD_REQUEST, "Invalid character name.");
        }
        if account.character(&data.name).is_some() {
            return data.respond(ResultCode::BAD_REQUEST, "Character already exists.");
        }
        let archetype_name = data.archetype.clone().unwrap_or_default();
        let archetype_name = if archetype_name.contains(':') {
            archetype_name
        } else {
            format!("character:{archetype_name}")
        };
        let archetype_id = self.namespaces.content_id(&archetype_name);
        let Some(archetype) = self.context.catalog.character(archetype_id) else {
            return data.respond(ResultCode::NOT_FOUND, "No such archetype.");
        };

        let character = Character::new(data.name.clone(), archetype_id, &self.context.catalog)
            .with_inventory(self.starting_inventory(&archetype.inventory));
        account.characters.push(character);
        if let Err(e) = self.accounts.save_account(account).await {
            tracing::error!(user = %account.username, error = %e, "Failed to save account");
            account.remove_character(&data.name);
            return data.respond(ResultCode::NOT_FOUND, "Could not save the character.");
        }
        tracing::info!(user = %account.username, character = %data.name, "Character created");
        data.respond(ResultCode::OK, "Character created.")
    }

    async fn delete_character(&self, client: &mut Client, data: CharacterData) -> CharacterData {
        let Some(account) = client.account.as_mut() else {
            return data.respond(ResultCode::BAD_REQUEST, "Not logged in.");
        };
        let Some(removed) = account.remove_character(&data.name) else {
            return data.respond(ResultCode::NOT_FOUND, "No such character.");
        };
        if let Err(e) = self.accounts.save_account(account).await {
            tracing::error!(user = %account.username, error = %e, "Failed to save account");
            account.characters.push(removed);
            return data.respond(ResultCode::NOT_FOUND, "Could not save the account.");
        }
        if client.character.as_deref() == Some(data.name.as_str()) {
            client.character = None;
            client.set_state(SessionState::LoggedIn);
        }
        data.respond(ResultCode::OK, "Character deleted.")
    }
}
