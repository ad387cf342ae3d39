//! Screen lifecycle driver.
//!
//! [`App`] owns the current route and, on room screens, the mounted
//! [`ClientController`]. Its [`run`](App::run) loop interleaves inbound
//! events, the 1 Hz countdown tick and user [`Intent`]s, handling each to
//! completion before taking the next. Rendering goes through a [`View`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use werewolf_core::game_state::{ClientGameState, GameEvent, LogCategory, StateChanged};
use werewolf_core::protocol::{GameResults, GameSettings, PlayerId, RoomCode};

use crate::client_controller::{ClientController, PollResult, Route, Screen};
use crate::config::ClientConfig;
use crate::entry;
use crate::error::ClientError;
use crate::identity::SessionStore;
use crate::net_client::NetClient;

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Create { name: String, settings: GameSettings },
    Join { name: String, room_code: String },
    Select(PlayerId),
    Submit,
    StartGame,
    Leave,
    /// Dismiss the results screen.
    Acknowledge,
    Quit,
}

/// Rendering surface for the app.
pub trait View {
    /// A new route is showing. `results` is set only for the results screen.
    fn show_route(&mut self, route: &Route, results: Option<&GameResults>);
    /// Room state changed.
    fn show_room(&mut self, state: &ClientGameState, changed: StateChanged);
    /// The countdown ticked locally.
    fn show_tick(&mut self, state: &ClientGameState);
    /// Short feedback for the user, e.g. a rejected join.
    fn show_notice(&mut self, message: &str);
}

pub struct App<V: View> {
    net: NetClient,
    store: Arc<dyn SessionStore>,
    config: ClientConfig,
    view: V,
    route: Route,
    controller: Option<ClientController>,
}

impl<V: View> App<V> {
    pub fn new(net: NetClient, store: Arc<dyn SessionStore>, config: ClientConfig, view: V) -> Self {
        Self {
            net,
            store,
            config,
            view,
            route: Route::Home,
            controller: None,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn controller(&self) -> Option<&ClientController> {
        self.controller.as_ref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Route to show on startup when resuming: the saved room's lobby, which
    /// forwards to the game screen if the game is running.
    pub fn resume_route(&self) -> Route {
        match self.store.load() {
            Some(identity) => Route::Lobby(identity.room_code),
            None => Route::JoinGame,
        }
    }

    /// Drive the app until the user quits or the intent channel closes.
    ///
    /// Returns the view so callers can inspect what was rendered.
    pub async fn run(mut self, start: Route, mut intents: mpsc::UnboundedReceiver<Intent>) -> V {
        self.navigate(start);
        let mut ticker = new_ticker(&self.config);

        loop {
            let ticking = self.controller.as_ref().is_some_and(|c| c.is_ticking());

            tokio::select! {
                poll = next_poll(self.controller.as_mut()) => {
                    // Local ticks restart from every authoritative value.
                    let resync = matches!(poll, PollResult::Updated(c) if c.timer)
                        || matches!(poll, PollResult::Navigate(_));
                    if !self.on_poll(poll) {
                        break;
                    }
                    if resync {
                        ticker.reset();
                    }
                }
                _ = ticker.tick(), if ticking => {
                    if let Some(ctrl) = self.controller.as_mut()
                        && ctrl.tick()
                    {
                        self.view.show_tick(&ctrl.state);
                    }
                }
                intent = intents.recv() => match intent {
                    None | Some(Intent::Quit) => break,
                    Some(intent) => self.on_intent(intent).await,
                },
            }
        }

        self.net.close();
        self.view
    }

    /// Apply one poll result. Returns `false` when the app should stop.
    fn on_poll(&mut self, poll: PollResult) -> bool {
        match poll {
            PollResult::Updated(changed) => {
                if let Some(ctrl) = &self.controller
                    && changed.any()
                {
                    self.view.show_room(&ctrl.state, changed);
                }
                true
            }
            PollResult::Navigate(route) => {
                let from_lobby = matches!(self.route, Route::Lobby(_));
                if route == Route::JoinGame
                    && let Some(GameEvent::ServerError { message }) = self
                        .controller
                        .as_ref()
                        .and_then(|c| c.state.events.back())
                {
                    let message = message.clone();
                    self.view.show_notice(&message);
                }
                self.navigate(route);
                if from_lobby
                    && let Some(ctrl) = self.controller.as_mut()
                    && ctrl.screen() == Screen::Game
                {
                    ctrl.expect_timer();
                }
                true
            }
            PollResult::Disconnected => {
                self.view.show_notice("Disconnected from the server");
                false
            }
            PollResult::Empty => true,
        }
    }

    async fn on_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Create { name, settings } => {
                let result =
                    entry::create_room(&self.net, &name, settings, self.config.request_timeout)
                        .await;
                self.after_entry(result);
            }
            Intent::Join { name, room_code } => {
                let result =
                    entry::join_room(&self.net, &name, &room_code, self.config.request_timeout)
                        .await;
                self.after_entry(result);
            }
            Intent::Select(target) => {
                let Some(ctrl) = self.controller.as_mut() else {
                    return;
                };
                match ctrl.select_target(&target) {
                    Ok(()) => self.view.show_room(
                        &ctrl.state,
                        StateChanged {
                            submission: true,
                            ..StateChanged::default()
                        },
                    ),
                    Err(e) => {
                        ctrl.add_message(e.to_string(), LogCategory::Error);
                        self.view.show_room(
                            &ctrl.state,
                            StateChanged {
                                log: true,
                                ..StateChanged::default()
                            },
                        );
                    }
                }
            }
            Intent::Submit => {
                let Some(ctrl) = self.controller.as_mut() else {
                    return;
                };
                if ctrl.submit() {
                    self.view.show_room(
                        &ctrl.state,
                        StateChanged {
                            submission: true,
                            log: true,
                            ..StateChanged::default()
                        },
                    );
                } else {
                    self.view.show_notice("Nothing to submit");
                }
            }
            Intent::StartGame => {
                if let Some(ctrl) = self.controller.as_mut()
                    && let Err(e) = ctrl.start_game()
                {
                    self.view.show_notice(&e.to_string());
                }
            }
            Intent::Leave => {
                if let Some(ctrl) = self.controller.take() {
                    let route = ctrl.leave();
                    self.navigate(route);
                }
            }
            Intent::Acknowledge => {
                if self.route == Route::GameOver {
                    self.navigate(Route::Home);
                }
            }
            Intent::Quit => {}
        }
    }

    fn after_entry(&mut self, result: Result<RoomCode, ClientError>) {
        match result {
            Ok(code) => self.navigate(Route::Lobby(code)),
            Err(e) => {
                tracing::info!(error = %e, "entry failed");
                self.view.show_notice(&e.to_string());
            }
        }
    }

    /// Switch routes. The new screen subscribes before the old one is dropped.
    fn navigate(&mut self, route: Route) {
        tracing::debug!(from = ?self.route, to = ?route, "navigate");
        let next = match &route {
            Route::Lobby(code) => Some(self.mount(Screen::Lobby, code.clone())),
            Route::Game(code) => Some(self.mount(Screen::Game, code.clone())),
            Route::Home | Route::JoinGame | Route::GameOver => None,
        };
        self.controller = next;

        let results = match route {
            Route::GameOver => self.store.take_results(),
            _ => None,
        };
        self.view.show_route(&route, results.as_ref());
        self.route = route;
    }

    fn mount(&self, screen: Screen, code: RoomCode) -> ClientController {
        ClientController::mount(self.net.clone(), self.store.clone(), screen, code)
    }
}

fn new_ticker(config: &ClientConfig) -> Interval {
    let mut ticker = tokio::time::interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_poll(controller: Option<&mut ClientController>) -> PollResult {
    match controller {
        Some(ctrl) => ctrl.recv().await,
        None => std::future::pending().await,
    }
}
