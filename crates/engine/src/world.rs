//! World task: a fixed-tick loop over the locations of one world and the
//! clients playing in it.

use std::sync::Arc;

use delver_domain::{
    Archetype, Catalog, Event, GenGrid, GenerationError, Location, LocationId, StyleRegistry, Wid,
    WidGenerator, WorldId,
};
use delver_shared::{
    EventData, EventsData, InventoryData, LocationData, Message, OwnerData, Reply, ResultCode,
    SkillsData, TileData, WorldData,
};
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::WorldConfig;
use crate::infrastructure::ports::ClockPort;
use crate::session::{bad_request, Client, SessionState};

const LOCATION_STYLE: &str = "rooms";

/// Sent from a World to the Universe.
#[derive(Debug)]
pub enum WorldReport {
    /// The client left the world and goes back to the lobby.
    Left { world: WorldId, client: Client },
    /// The connection closed while in the world.
    Closed { world: WorldId, client: Client },
    /// The world task has finished.
    Stopped { world: WorldId },
}

/// Services shared by every world.
#[derive(Clone)]
pub struct WorldContext {
    pub catalog: Arc<Catalog>,
    pub styles: Arc<StyleRegistry>,
    pub wids: Arc<WidGenerator>,
    pub clock: Arc<dyn ClockPort>,
    pub config: WorldConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Stay,
    Leave,
    Closed,
}

pub struct World {
    id: WorldId,
    name: String,
    context: WorldContext,
    locations: Vec<Location>,
    clients: Vec<Client>,
    joins: mpsc::Receiver<Client>,
    reports: mpsc::UnboundedSender<WorldReport>,
    rng: StdRng,
}

impl World {
    pub fn new(
        id: WorldId,
        name: impl Into<String>,
        context: WorldContext,
        joins: mpsc::Receiver<Client>,
        reports: mpsc::UnboundedSender<WorldReport>,
        rng: StdRng,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            context,
            locations: Vec::new(),
            clients: Vec::new(),
            joins,
            reports,
            rng,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.context.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(world_id = %self.id, name = %self.name, "World started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.tick(),
            }
        }

        self.stop();
    }

    pub(crate) fn tick(&mut self) {
        while let Ok(client) = self.joins.try_recv() {
            self.admit(client);
        }
        self.update_clients();
        self.process_locations();
        self.reap_idle_locations();
    }

    fn report(&self, report: WorldReport) {
        if self.reports.send(report).is_err() {
            tracing::debug!(world_id = %self.id, "Universe gone, dropping world report");
        }
    }

    fn reject(&self, mut client: Client, code: ResultCode, reason: &str) {
        client.send(Message::JoinWorld(
            WorldData {
                name: self.name.clone(),
                id: Some(self.id),
                ..Default::default()
            }
            .respond(code, reason),
        ));
        client.set_state(SessionState::CharacterSelected);
        client.leave_world();
        self.report(WorldReport::Left {
            world: self.id,
            client,
        });
    }

    fn location_for_join(&mut self) -> Result<usize, GenerationError> {
        if !self.locations.is_empty() {
            return Ok(0);
        }
        let config = &self.context.config;
        let mut grid = GenGrid::new(config.location_width, config.location_height);
        self.context
            .styles
            .generate(LOCATION_STYLE, &mut grid, &mut self.rng)?;
        let location = Location::from_grid(
            LocationId::new(),
            &grid,
            self.context.catalog.clone(),
            self.context.wids.clone(),
        );
        tracing::info!(world_id = %self.id, location_id = %location.id(), "Location generated");
        self.locations.push(location);
        Ok(self.locations.len() - 1)
    }

    fn admit(&mut self, mut client: Client) {
        let character = client
            .account
            .as_ref()
            .zip(client.character.as_deref())
            .and_then(|(account, name)| account.character(name))
            .cloned();
        let Some(character) = character else {
            tracing::warn!(world_id = %self.id, client = %client.id(), "Join without a selected character");
            return self.reject(client, ResultCode::NOT_FOUND, "No such character.");
        };
        let already_playing = self
            .clients
            .iter()
            .any(|c| c.username() == client.username() && c.character == client.character);
        if already_playing {
            tracing::warn!(world_id = %self.id, client = %client.id(), character = %character.name, "Character is already in this world");
            return self.reject(client, ResultCode::FORBIDDEN, "Character is already in this world.");
        }
        if self.clients.len() >= self.context.config.max_players {
            return self.reject(client, ResultCode::FORBIDDEN, "World is full.");
        }
        let index = match self.location_for_join() {
            Ok(index) => index,
            Err(e) => {
                tracing::error!(world_id = %self.id, error = %e, "Failed to generate location");
                return self.reject(client, ResultCode::FORBIDDEN, "Could not enter the world.");
            }
        };

        let location = &mut self.locations[index];
        let wid = match location.add_character(character, &mut self.rng) {
            Ok(wid) => wid,
            Err(e) => {
                tracing::warn!(world_id = %self.id, error = %e, "Failed to place character");
                let reason = e.to_string();
                return self.reject(client, ResultCode::FORBIDDEN, &reason);
            }
        };

        client.wid = wid;
        client.world = Some(self.id);
        client.location = Some(location.id());
        client.set_state(SessionState::InWorld);
        client.send(Message::JoinWorld(
            WorldData {
                name: self.name.clone(),
                id: Some(self.id),
                ..Default::default()
            }
            .respond(ResultCode::OK, "Joined world."),
        ));
        client.send(Message::Location(location.snapshot().into()));
        if let Some(character) = location.character(wid) {
            client.send(Message::Owner(OwnerData {
                wid,
                inventory: character.inventory.clone(),
                skills: character.skills.clone(),
            }));
        }
        tracing::info!(
            world_id = %self.id,
            client = %client.id(),
            wid = %wid,
            "Client joined world"
        );
        self.clients.push(client);
    }

    fn location(&self, id: Option<LocationId>) -> Option<&Location> {
        let id = id?;
        self.locations.iter().find(|l| l.id() == id)
    }

    fn location_mut(&mut self, id: Option<LocationId>) -> Option<&mut Location> {
        let id = id?;
        self.locations.iter_mut().find(|l| l.id() == id)
    }

    /// Take the character out of its location and back into the account.
    fn release(&mut self, client: &mut Client) {
        let now = self.context.clock.now();
        let world_id = self.id;
        let wid = client.wid;
        if let Some(location) = self.location_mut(client.location) {
            match location.remove_character(wid, now) {
                Ok(character) => {
                    if let Some(account) = client.account.as_mut() {
                        account.store_character(character);
                    }
                }
                Err(e) => {
                    tracing::warn!(world_id = %world_id, wid = %wid, error = %e, "Failed to remove character");
                }
            }
        }
        client.leave_world();
    }

    fn update_clients(&mut self) {
        let clients = std::mem::take(&mut self.clients);
        let mut staying = Vec::with_capacity(clients.len());

        for mut client in clients {
            let inbox = client.drain();
            let mut outcome = Outcome::Stay;
            for message in inbox.messages {
                outcome = self.handle_message(&mut client, message);
                if outcome != Outcome::Stay {
                    break;
                }
            }
            if outcome == Outcome::Stay && inbox.disconnected {
                outcome = Outcome::Closed;
            }

            match outcome {
                Outcome::Stay => staying.push(client),
                Outcome::Leave => {
                    self.release(&mut client);
                    tracing::info!(world_id = %self.id, client = %client.id(), "Client left world");
                    self.report(WorldReport::Left {
                        world: self.id,
                        client,
                    });
                }
                Outcome::Closed => {
                    self.release(&mut client);
                    tracing::info!(world_id = %self.id, client = %client.id(), "Client disconnected");
                    self.report(WorldReport::Closed {
                        world: self.id,
                        client,
                    });
                }
            }
        }

        // Clients admitted while handling messages are kept too.
        staying.append(&mut self.clients);
        self.clients = staying;
    }

    fn handle_message(&mut self, client: &mut Client, message: Message) -> Outcome {
        tracing::debug!(world_id = %self.id, client = %client.id(), kind = message.kind(), "World message");
        let wid = client.wid;

        match message {
            Message::Ping(_) => {
                client.send(Message::ping());
            }
            Message::Desire(data) => {
                let Some(desire) = data.desire else {
                    client.send(Message::Desire(data.respond(ResultCode::BAD_REQUEST, "Missing desire.")));
                    return Outcome::Stay;
                };
                let result = match self.location_mut(client.location) {
                    Some(location) => location.set_desire(wid, desire).map_err(|e| e.to_string()),
                    None => Err("Not in a location.".to_string()),
                };
                if let Err(reason) = result {
                    client.send(Message::Desire(data.respond(ResultCode::BAD_REQUEST, reason)));
                }
            }
            Message::Location(data) => {
                let reply = match self.location(client.location) {
                    Some(location) => LocationData::from(location.snapshot()),
                    None => data.respond(ResultCode::NOT_FOUND, "Not in a location."),
                };
                client.send(Message::Location(reply));
            }
            Message::Tile(data) => {
                let tile = data
                    .id
                    .and_then(|id| self.context.catalog.archetype(id))
                    .and_then(|archetype| match archetype {
                        Archetype::Tile(tile) => Some(tile.clone()),
                        _ => None,
                    });
                let reply = match tile {
                    Some(tile) => TileData {
                        tile: Some(tile),
                        ..data
                    }
                    .respond(ResultCode::OK, ""),
                    None => data.respond(ResultCode::NOT_FOUND, "No such tile."),
                };
                client.send(Message::Tile(reply));
            }
            Message::Inventory(_) => {
                if let Some(character) = self
                    .location(client.location)
                    .and_then(|l| l.character(wid))
                {
                    client.send(Message::Inventory(InventoryData {
                        wid,
                        inventory: character.inventory.clone(),
                    }));
                }
            }
            Message::Skills(_) => {
                if let Some(character) = self
                    .location(client.location)
                    .and_then(|l| l.character(wid))
                {
                    client.send(Message::Skills(SkillsData {
                        wid,
                        skills: character.skills.clone(),
                    }));
                }
            }
            Message::UnjoinCharacter(data) => {
                client.send(Message::UnjoinCharacter(data.respond(ResultCode::OK, "Character unjoined.")));
                client.character = None;
                client.set_state(SessionState::LoggedIn);
                return Outcome::Leave;
            }
            Message::Logout(data) => {
                client.send(Message::Logout(data.respond(ResultCode::OK, "Logged out.")));
                client.set_state(SessionState::Waiting);
                return Outcome::Leave;
            }
            other => {
                if let Some(reply) = bad_request(other, "Not available while in a world.") {
                    client.send(reply);
                }
            }
        }
        Outcome::Stay
    }

    fn process_locations(&mut self) {
        for location in &mut self.locations {
            let events = location.process(&mut self.rng);
            let id = location.id();

            for client in self.clients.iter().filter(|c| c.location == Some(id)) {
                if !events.is_empty() {
                    client.send(Message::Events(EventsData {
                        events: events.clone(),
                    }));
                }
                let private = location.take_private_events(client.wid);
                if !private.is_empty() {
                    client.send(Message::Events(EventsData { events: private }));
                }
                if inventory_changed(&events, client.wid) {
                    if let Some(character) = location.character(client.wid) {
                        client.send(Message::Inventory(InventoryData {
                            wid: client.wid,
                            inventory: character.inventory.clone(),
                        }));
                    }
                }
            }
        }
    }

    fn reap_idle_locations(&mut self) {
        let Some(idle) = self.context.config.location_idle else {
            return;
        };
        let now = self.context.clock.now();
        let world_id = self.id;
        self.locations.retain(|location| {
            let expired = location.roster().is_empty()
                && location
                    .idle_since()
                    .and_then(|since| (now - since).to_std().ok())
                    .is_some_and(|elapsed| elapsed >= idle);
            if expired {
                tracing::info!(world_id = %world_id, location_id = %location.id(), "Unloading idle location");
            }
            !expired
        });
    }

    /// Hand every client back to the Universe, then report the world gone.
    fn stop(&mut self) {
        tracing::info!(world_id = %self.id, clients = self.clients.len(), "World stopping");
        for mut client in std::mem::take(&mut self.clients) {
            self.release(&mut client);
            client.set_state(SessionState::CharacterSelected);
            client.send(Message::Event(EventData {
                event: Event::Notice {
                    message: "The world has closed.".into(),
                },
            }));
            self.report(WorldReport::Left {
                world: self.id,
                client,
            });
        }
        self.joins.close();
        while let Ok(client) = self.joins.try_recv() {
            self.reject(client, ResultCode::NOT_FOUND, "The world has closed.");
        }
        self.report(WorldReport::Stopped { world: self.id });
    }
}

fn inventory_changed(events: &[Event], wid: Wid) -> bool {
    events
        .iter()
        .any(|event| event.changes_inventory() && event.actor() == Some(wid))
}
