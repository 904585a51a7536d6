//! The IRC protocol engine.
//!
//! [`Client`] owns the per-connection state (channels, nickname, MOTD,
//! ISUPPORT map, pending WHOIS queries), consumes parsed [`Message`]s,
//! and emits semantic [`Event`]s. One engine task per connection does
//! all dispatch and state mutation; callers interact through the
//! cloneable handle: synchronous `send`/accessors, awaitable
//! connect/disconnect and request methods.
//!
//! Outbound lines pass through a pacing queue drained once per
//! `send_interval`; `send_now` bypasses the queue for handshake-class
//! traffic. Queued lines keep FIFO order among themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::bus::{EventBus, SubscriptionId};
use crate::channel::{Channel, Role};
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::event::{
    ChatMessage, ErrorOrigin, Event, EventKind, KickInfo, Membership, ModeInfo, ServerVersion,
};
use crate::isupport::Isupport;
use crate::message::Message;
use crate::mode::ModeChange;
use crate::transport::{Connection, TcpConnection, MAX_LINE_LEN};
use crate::whois::Whois;

/// Per-connection client state, reset on connect (metadata excepted).
#[derive(Debug, Default)]
struct ClientState {
    nickname: String,
    ready: bool,
    connected: bool,
    errored: bool,
    motd: String,
    supported: Isupport,
    channels: HashMap<String, Channel>,
    whois: HashMap<String, Whois>,
    data: HashMap<String, String>,
}

struct Outbound {
    queue_tx: mpsc::UnboundedSender<String>,
    now_tx: mpsc::UnboundedSender<String>,
    shutdown_tx: mpsc::UnboundedSender<(Option<String>, oneshot::Sender<()>)>,
}

struct Shared {
    config: Config,
    state: Mutex<ClientState>,
    bus: EventBus,
    outbound: Mutex<Option<Outbound>>,
    connection: Mutex<Option<Box<dyn Connection>>>,
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Teardown,
}

/// Handle to one IRC connection.
///
/// Cheap to clone; all clones share the same engine.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    /// A client over the provided TCP/TLS transport.
    pub fn new(config: Config) -> Client {
        Client::with_connection(config, TcpConnection::new())
    }

    /// A client over a custom transport.
    pub fn with_connection(config: Config, connection: impl Connection + 'static) -> Client {
        let nickname = config.nickname.clone();
        Client {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(ClientState {
                    nickname,
                    ..ClientState::default()
                }),
                bus: EventBus::new(),
                outbound: Mutex::new(None),
                connection: Mutex::new(Some(Box::new(connection))),
            }),
        }
    }

    fn state_lock(&self) -> MutexGuard<'_, ClientState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: Event) {
        self.shared.bus.dispatch(&event);
    }

    // ---- lifecycle -----------------------------------------------------

    /// Connect, start the engine task, and perform the registration
    /// handshake (PASS/NICK/USER, all with send-now priority).
    pub async fn connect(&self) -> Result<()> {
        if self
            .shared
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
        {
            return Err(ClientError::AlreadyConnected);
        }
        let mut conn = self
            .shared
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ClientError::AlreadyConnected)?;

        let config = &self.shared.config;
        if let Err(e) = conn.connect(config).await {
            self.shared
                .connection
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(conn);
            return Err(e.into());
        }

        {
            let mut state = self.state_lock();
            state.nickname = config.nickname.clone();
            state.ready = false;
            state.connected = true;
            state.errored = false;
            state.motd.clear();
            state.supported.clear();
            state.channels.clear();
            state.whois.clear();
            // state.data survives reconnects
        }

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (now_tx, now_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        *self
            .shared
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Outbound {
            queue_tx,
            now_tx,
            shutdown_tx,
        });

        // Handshake lines enqueue ahead of anything a Connect subscriber
        // sends.
        if let Some(password) = &config.password {
            self.send_now(format!("PASS {}", password))?;
        }
        self.send_now(format!("NICK {}", config.nickname))?;
        self.send_now(format!(
            "USER {} {} {} :{}",
            config.username(),
            config.username(),
            config.host,
            config.realname()
        ))?;
        self.emit(Event::Connect);

        tokio::spawn(run(self.clone(), conn, queue_rx, now_rx, shutdown_rx));
        Ok(())
    }

    /// Send QUIT, close the transport, and stop the engine task.
    ///
    /// The QUIT is written synchronously before the transport closes.
    /// Outstanding request futures resolve with
    /// [`ClientError::Disconnected`].
    pub async fn disconnect(&self, reason: Option<&str>) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let outbound = self
                .shared
                .outbound
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(out) = outbound.as_ref() else {
                return Ok(());
            };
            if out
                .shutdown_tx
                .send((reason.map(str::to_string), ack_tx))
                .is_err()
            {
                return Ok(());
            }
        }
        let _ = ack_rx.await;
        Ok(())
    }

    // ---- sending -------------------------------------------------------

    /// Queue one line for the paced drain.
    pub fn send(&self, line: impl Into<String>) -> Result<()> {
        self.send_line(line.into(), false)
    }

    /// Write one line ahead of the queue, without waiting for a tick.
    pub fn send_now(&self, line: impl Into<String>) -> Result<()> {
        self.send_line(line.into(), true)
    }

    fn send_line(&self, line: String, now: bool) -> Result<()> {
        if line.len() > MAX_LINE_LEN {
            return Err(ClientError::LineTooLong(line.len()));
        }
        let outbound = self
            .shared
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(out) = outbound.as_ref() else {
            return Err(ClientError::NotConnected);
        };
        let tx = if now { &out.now_tx } else { &out.queue_tx };
        tx.send(line).map_err(|_| ClientError::NotConnected)
    }

    // ---- commands ------------------------------------------------------

    /// Join a channel, with an optional key.
    pub fn join(&self, channel: &str, key: Option<&str>) -> Result<()> {
        match key {
            Some(key) => self.send(format!("JOIN {} {}", channel, key)),
            None => self.send(format!("JOIN {}", channel)),
        }
    }

    /// Leave a channel.
    pub fn part(&self, channel: &str, reason: Option<&str>) -> Result<()> {
        match reason {
            Some(reason) => self.send(format!("PART {} :{}", channel, reason)),
            None => self.send(format!("PART {}", channel)),
        }
    }

    /// Send a PRIVMSG.
    pub fn privmsg(&self, target: &str, text: &str) -> Result<()> {
        self.send(format!("PRIVMSG {} :{}", target, text))
    }

    /// Send a NOTICE.
    pub fn notice(&self, target: &str, text: &str) -> Result<()> {
        self.send(format!("NOTICE {} :{}", target, text))
    }

    /// Send a CTCP ACTION (`/me`).
    pub fn action(&self, target: &str, text: &str) -> Result<()> {
        self.send(format!("PRIVMSG {} :\u{1}ACTION {}\u{1}", target, text))
    }

    /// Request a nickname change.
    pub fn set_nickname(&self, nick: &str) -> Result<()> {
        self.send(format!("NICK {}", nick))
    }

    /// Send a WALLOPS.
    pub fn wallops(&self, text: &str) -> Result<()> {
        self.send(format!("WALLOPS :{}", text))
    }

    /// Re-request the NAMES roster for a channel.
    pub fn refresh_user_list(&self, channel: &str) -> Result<()> {
        self.send(format!("NAMES {}", channel))
    }

    /// Set a channel topic, validated against the server's TOPICLEN.
    pub fn set_channel_topic(&self, channel: &str, topic: &str) -> Result<()> {
        if let Some(max) = self.state_lock().supported.topic_len() {
            if topic.len() > max {
                return Err(ClientError::TopicTooLong {
                    len: topic.len(),
                    max,
                });
            }
        }
        self.send(format!("TOPIC {} :{}", channel, topic))
    }

    // ---- request/response bridge ---------------------------------------

    /// One-shot filtered await: subscribe, send, resolve on the first
    /// matching event. Mismatching events do not consume the
    /// subscription. No built-in timeout.
    async fn request<T, P, X>(
        &self,
        kind: EventKind,
        filter: P,
        extract: X,
        line: String,
    ) -> Result<T>
    where
        T: Send + 'static,
        P: Fn(&Event) -> bool + Send + 'static,
        X: Fn(&Event) -> Option<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<T>>();
        let slot = Arc::new(Mutex::new(Some(tx)));

        let resolve = slot.clone();
        let reply_id = self
            .shared
            .bus
            .subscribe_once_filtered(kind, filter, move |event| {
                if let Some(value) = extract(event) {
                    if let Some(tx) = resolve
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take()
                    {
                        let _ = tx.send(Ok(value));
                    }
                }
            });
        let cancel = slot.clone();
        let cancel_id = self
            .shared
            .bus
            .subscribe_once(EventKind::Disconnect, move |_| {
                if let Some(tx) = cancel
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
                {
                    let _ = tx.send(Err(ClientError::Disconnected));
                }
            });

        let result = match self.send(line) {
            Ok(()) => rx.await.unwrap_or_else(|_| Err(ClientError::Disconnected)),
            Err(e) => Err(e),
        };
        self.shared.bus.unsubscribe(reply_id);
        self.shared.bus.unsubscribe(cancel_id);
        result
    }

    /// WHOIS a nickname; resolves when the 318 terminator arrives.
    pub async fn whois(&self, nick: &str) -> Result<Whois> {
        let wanted = nick.to_string();
        let taken = wanted.clone();
        self.request(
            EventKind::Whois,
            move |e| matches!(e, Event::Whois(w) if w.nickname == wanted),
            move |e| match e {
                Event::Whois(w) if w.nickname == taken => Some(w.as_ref().clone()),
                _ => None,
            },
            format!("WHOIS {}", nick),
        )
        .await
    }

    /// Whether `name` is online, per the next ISON reply.
    pub async fn is_user_on(&self, name: &str) -> Result<bool> {
        let wanted = name.to_string();
        self.request(
            EventKind::IsOn,
            |_| true,
            move |e| match e {
                Event::IsOn(nicks) => Some(nicks.iter().any(|n| n == &wanted)),
                _ => None,
            },
            format!("ISON {}", name),
        )
        .await
    }

    /// The server's VERSION reply, optionally for a remote server.
    pub async fn server_version(&self, target: Option<&str>) -> Result<ServerVersion> {
        let line = match target {
            Some(target) => format!("VERSION {}", target),
            None => "VERSION".to_string(),
        };
        self.request(
            EventKind::ServerVersion,
            |_| true,
            |e| match e {
                Event::ServerVersion(v) => Some(v.clone()),
                _ => None,
            },
            line,
        )
        .await
    }

    /// Query a channel's topic; resolves on the Topic reply for that
    /// channel.
    pub async fn channel_topic(&self, channel: &str) -> Result<String> {
        let wanted = channel.to_string();
        let taken = wanted.clone();
        self.request(
            EventKind::Topic,
            move |e| matches!(e, Event::Topic { channel, .. } if *channel == wanted),
            move |e| match e {
                Event::Topic { channel, topic } if *channel == taken => Some(topic.clone()),
                _ => None,
            },
            format!("TOPIC {}", channel),
        )
        .await
    }

    // ---- subscriptions -------------------------------------------------

    /// Subscribe to every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.shared.bus.subscribe(kind, handler)
    }

    /// Subscribe to the next event of `kind` only.
    pub fn subscribe_once<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.shared.bus.subscribe_once(kind, handler)
    }

    /// Persistent subscription gated by a predicate.
    pub fn subscribe_filtered<P, F>(&self, kind: EventKind, filter: P, handler: F) -> SubscriptionId
    where
        P: Fn(&Event) -> bool + Send + 'static,
        F: FnMut(&Event) + Send + 'static,
    {
        self.shared.bus.subscribe_filtered(kind, filter, handler)
    }

    /// One-shot subscription gated by a predicate; mismatches do not
    /// consume it.
    pub fn subscribe_once_filtered<P, F>(
        &self,
        kind: EventKind,
        filter: P,
        handler: F,
    ) -> SubscriptionId
    where
        P: Fn(&Event) -> bool + Send + 'static,
        F: FnMut(&Event) + Send + 'static,
    {
        self.shared.bus.subscribe_once_filtered(kind, filter, handler)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.shared.bus.unsubscribe(id)
    }

    // ---- accessors -----------------------------------------------------

    /// Our current nickname.
    pub fn nickname(&self) -> String {
        self.state_lock().nickname.clone()
    }

    /// Whether the server finished its preamble (MOTD end or first
    /// PRIVMSG).
    pub fn is_ready(&self) -> bool {
        self.state_lock().ready
    }

    /// Whether the transport is up.
    pub fn is_connected(&self) -> bool {
        self.state_lock().connected
    }

    /// Whether a transport or server error was recorded.
    pub fn is_errored(&self) -> bool {
        self.state_lock().errored
    }

    /// The accumulated MOTD text.
    pub fn motd(&self) -> String {
        self.state_lock().motd.clone()
    }

    /// Snapshot of the server's ISUPPORT advertisements.
    pub fn supported(&self) -> Isupport {
        self.state_lock().supported.clone()
    }

    /// Snapshot of one channel's state, if we are in it.
    pub fn channel(&self, name: &str) -> Option<Channel> {
        self.state_lock().channels.get(name).cloned()
    }

    /// Names of the channels we are currently in.
    pub fn channel_names(&self) -> Vec<String> {
        self.state_lock().channels.keys().cloned().collect()
    }

    /// Caller metadata lookup. The map survives reconnects.
    pub fn data_get(&self, key: &str) -> Option<String> {
        self.state_lock().data.get(key).cloned()
    }

    /// Store caller metadata.
    pub fn data_set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state_lock().data.insert(key.into(), value.into());
    }

    // ---- inbound dispatch ----------------------------------------------

    fn handle_line(&self, raw: &str) -> Flow {
        self.emit(Event::LineReceive(raw.to_string()));
        let msg = match Message::parse(raw) {
            Ok(msg) => msg,
            Err(cause) => {
                // Bad lines are a per-line diagnostic, never a teardown
                let err = ClientError::InvalidMessage {
                    string: raw.to_string(),
                    cause,
                };
                warn!("ignoring inbound line: {}", err);
                return Flow::Continue;
            }
        };
        self.dispatch_message(&msg)
    }

    fn dispatch_message(&self, msg: &Message) -> Flow {
        let mut events: Vec<Event> = Vec::new();
        let mut queued: Vec<String> = Vec::new();
        let mut flow = Flow::Continue;

        {
            let mut state = self.state_lock();
            let state = &mut *state;
            match msg.command.as_str() {
                "PING" => {
                    let token = msg
                        .trailing
                        .as_deref()
                        .or_else(|| msg.param(0))
                        .unwrap_or_default();
                    queued.push(format!("PONG :{}", token));
                }
                "PONG" => {
                    let token = msg
                        .trailing
                        .clone()
                        .or_else(|| msg.params.last().cloned())
                        .unwrap_or_default();
                    events.push(Event::Pong { token });
                }
                "PRIVMSG" => {
                    fire_ready(state, &mut events);
                    let from = msg.nick().unwrap_or_default().to_string();
                    let target = msg.param(0).unwrap_or_default().to_string();
                    let text = msg.trailing.clone().unwrap_or_default();
                    if let Some(ctcp) = text.strip_prefix('\u{1}') {
                        let ctcp = ctcp.strip_suffix('\u{1}').unwrap_or(ctcp).to_string();
                        events.push(Event::Ctcp(ChatMessage {
                            from: from.clone(),
                            target: target.clone(),
                            text: ctcp.clone(),
                        }));
                        if let Some(action) = ctcp.strip_prefix("ACTION ") {
                            events.push(Event::Action(ChatMessage {
                                from,
                                target,
                                text: action.to_string(),
                            }));
                        }
                    } else {
                        events.push(Event::Message(ChatMessage { from, target, text }));
                    }
                }
                "NOTICE" => {
                    let target = msg.param(0).unwrap_or_default().to_string();
                    let from = if target == "*" {
                        msg.prefix().unwrap_or_default().to_string()
                    } else {
                        msg.nick().unwrap_or_default().to_string()
                    };
                    events.push(Event::Notice(ChatMessage {
                        from,
                        target,
                        text: msg.trailing.clone().unwrap_or_default(),
                    }));
                }
                "JOIN" => {
                    let who = msg.nick().unwrap_or_default().to_string();
                    let channel = msg
                        .param(0)
                        .or_else(|| msg.trailing.as_deref())
                        .unwrap_or_default()
                        .to_string();
                    if who == state.nickname {
                        state
                            .channels
                            .entry(channel.clone())
                            .or_insert_with(|| Channel::new(&channel));
                        queued.push(format!("MODE {} +b", channel));
                        events.push(Event::BotJoin { channel });
                    } else {
                        if let Some(chan) = state.channels.get_mut(&channel) {
                            chan.insert(&who, Role::Member);
                        }
                        events.push(Event::Join(Membership {
                            channel,
                            nick: who,
                            reason: None,
                        }));
                    }
                }
                "PART" => {
                    let who = msg.nick().unwrap_or_default().to_string();
                    let (channel, reason) = match msg.param(0) {
                        Some(chan) => (chan.to_string(), msg.trailing.clone()),
                        None => (msg.trailing.clone().unwrap_or_default(), None),
                    };
                    if let Some(chan) = state.channels.get_mut(&channel) {
                        chan.remove(&who);
                    }
                    let own = who == state.nickname;
                    events.push(Event::Part(Membership {
                        channel: channel.clone(),
                        nick: who,
                        reason,
                    }));
                    if own {
                        state.channels.remove(&channel);
                        events.push(Event::BotPart { channel });
                    }
                }
                "KICK" => {
                    let channel = msg.param(0).unwrap_or_default().to_string();
                    let nick = msg.param(1).unwrap_or_default().to_string();
                    if let Some(chan) = state.channels.get_mut(&channel) {
                        chan.remove(&nick);
                    }
                    if nick == state.nickname {
                        state.channels.remove(&channel);
                    }
                    events.push(Event::Kick(KickInfo {
                        channel,
                        nick,
                        by: msg.nick().unwrap_or_default().to_string(),
                        reason: msg.trailing.clone(),
                    }));
                }
                "QUIT" => {
                    let who = msg.nick().unwrap_or_default().to_string();
                    let reason = msg.trailing.clone();
                    if who == state.nickname {
                        // Server-initiated teardown of our own session;
                        // the link is already going away.
                        flow = Flow::Teardown;
                    } else {
                        for (name, chan) in state.channels.iter_mut() {
                            if chan.remove(&who) {
                                events.push(Event::QuitPart(Membership {
                                    channel: name.clone(),
                                    nick: who.clone(),
                                    reason: reason.clone(),
                                }));
                            }
                        }
                    }
                    events.push(Event::Quit { nick: who, reason });
                }
                "NICK" => {
                    let old = msg.nick().unwrap_or_default().to_string();
                    let new = msg
                        .trailing
                        .clone()
                        .or_else(|| msg.param(0).map(str::to_string))
                        .unwrap_or_default();
                    if old == state.nickname {
                        state.nickname = new.clone();
                    }
                    for chan in state.channels.values_mut() {
                        chan.rename(&old, &new);
                    }
                    events.push(Event::NickChange { old, new });
                }
                "MODE" => {
                    let target_name = msg.param(0).unwrap_or_default().to_string();
                    let mode_str = msg.param(1).or_else(|| msg.trailing.as_deref()).unwrap_or_default();
                    match ModeChange::parse(mode_str) {
                        Ok(change) => {
                            let arg = msg.param(2).map(str::to_string);
                            if let Some(chan) = state.channels.get_mut(&target_name) {
                                if let Some(nick) = arg.as_deref() {
                                    for (letter, added) in change.entries() {
                                        if let Some(role) = Role::from_mode(letter) {
                                            if added {
                                                chan.insert(nick, role);
                                            } else if chan.contains(nick) {
                                                chan.insert(nick, Role::Member);
                                            }
                                        }
                                    }
                                }
                                if change.entries().any(|(letter, _)| letter == 'b') {
                                    chan.clear_bans();
                                    queued.push(format!("MODE {} +b", target_name));
                                }
                            }
                            events.push(Event::Mode(ModeInfo {
                                channel: target_name,
                                change,
                                target: arg,
                                by: msg.nick().unwrap_or_default().to_string(),
                            }));
                        }
                        Err(e) => warn!("ignoring unparseable mode string: {}", e),
                    }
                }
                "TOPIC" => {
                    let channel = msg.param(0).unwrap_or_default().to_string();
                    let topic = msg.trailing.clone().unwrap_or_default();
                    if let Some(chan) = state.channels.get_mut(&channel) {
                        chan.set_topic(&topic);
                    }
                    events.push(Event::Topic { channel, topic });
                }
                "INVITE" => {
                    let channel = msg
                        .trailing
                        .clone()
                        .or_else(|| msg.param(1).map(str::to_string))
                        .unwrap_or_default();
                    events.push(Event::Invite {
                        channel,
                        from: msg.nick().unwrap_or_default().to_string(),
                    });
                }
                "ERROR" => {
                    state.errored = true;
                    events.push(Event::Error {
                        origin: ErrorOrigin::Server,
                        text: msg.trailing.clone().unwrap_or_default(),
                    });
                }
                "005" => {
                    if msg.params.len() > 1 {
                        state.supported.merge_params(&msg.params[1..]);
                    }
                    events.push(Event::ServerSupports(state.supported.to_map()));
                }
                "303" => {
                    let nicks = msg
                        .trailing
                        .as_deref()
                        .unwrap_or_default()
                        .split_whitespace()
                        .map(str::to_string)
                        .collect();
                    events.push(Event::IsOn(nicks));
                }
                "311" => {
                    let entry = whois_entry(state, msg.param(1));
                    entry.username = msg.param(2).map(str::to_string);
                    entry.hostname = msg.param(3).map(str::to_string);
                    entry.realname = msg.trailing.clone();
                }
                "312" => {
                    let entry = whois_entry(state, msg.param(1));
                    entry.server = msg.param(2).map(str::to_string);
                    entry.server_info = msg.trailing.clone();
                }
                "313" => {
                    whois_entry(state, msg.param(1)).operator = true;
                }
                "317" => {
                    let idle = msg.param(2).and_then(|s| s.parse().ok());
                    whois_entry(state, msg.param(1)).idle_seconds = idle;
                }
                "319" => {
                    let entry = whois_entry(state, msg.param(1));
                    for item in msg
                        .trailing
                        .as_deref()
                        .unwrap_or_default()
                        .split_whitespace()
                    {
                        entry.add_channel_entry(item);
                    }
                }
                "330" => {
                    whois_entry(state, msg.param(1)).account = msg.param(2).map(str::to_string);
                }
                "318" => {
                    let nick = msg.param(1).unwrap_or_default();
                    let whois = state
                        .whois
                        .remove(nick)
                        .unwrap_or_else(|| Whois::new(nick));
                    events.push(Event::Whois(Box::new(whois)));
                }
                "332" => {
                    let channel = msg.param(1).unwrap_or_default().to_string();
                    let topic = msg.trailing.clone().unwrap_or_default();
                    if let Some(chan) = state.channels.get_mut(&channel) {
                        chan.set_topic(&topic);
                    }
                    events.push(Event::Topic { channel, topic });
                }
                "351" => {
                    let (version, server) = if msg.params.len() >= 3 {
                        (msg.param(1), msg.param(2))
                    } else {
                        (msg.param(0), msg.param(1))
                    };
                    events.push(Event::ServerVersion(ServerVersion {
                        version: version.unwrap_or_default().to_string(),
                        server: server.unwrap_or_default().to_string(),
                        comments: msg.trailing.clone(),
                    }));
                }
                "353" => {
                    let channel = msg.param(2).unwrap_or_default();
                    if let Some(chan) = state.channels.get_mut(channel) {
                        for entry in msg
                            .trailing
                            .as_deref()
                            .unwrap_or_default()
                            .split_whitespace()
                        {
                            if let Some((role, nick)) = parse_names_entry(entry) {
                                chan.insert(nick, role);
                            }
                        }
                    }
                }
                "367" => {
                    let channel = msg.param(1).unwrap_or_default();
                    if let Some(chan) = state.channels.get_mut(channel) {
                        if let Some(mask) = msg.param(2) {
                            chan.add_ban(mask);
                        }
                    }
                }
                "372" => {
                    if let Some(line) = msg.trailing.as_deref() {
                        state.motd.push_str(line);
                        state.motd.push('\n');
                    }
                }
                "376" | "422" => {
                    if state.motd.is_empty() {
                        state.motd = msg
                            .trailing
                            .clone()
                            .unwrap_or_else(|| "No MOTD".to_string());
                    }
                    events.push(Event::Motd(state.motd.clone()));
                    fire_ready(state, &mut events);
                }
                "381" => {
                    events.push(Event::ServerOperator);
                }
                "433" => {
                    let nick = msg
                        .param(1)
                        .or_else(|| msg.param(0))
                        .unwrap_or_default()
                        .to_string();
                    events.push(Event::NickInUse { nick });
                }
                _ => {}
            }
        }

        for line in queued {
            if let Err(e) = self.send(line) {
                debug!("dropping internal reply: {}", e);
            }
        }
        for event in events {
            self.emit(event);
        }
        flow
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state_lock();
        f.debug_struct("Client")
            .field("nickname", &state.nickname)
            .field("connected", &state.connected)
            .field("ready", &state.ready)
            .field("channels", &state.channels.len())
            .finish()
    }
}

fn fire_ready(state: &mut ClientState, events: &mut Vec<Event>) {
    if !state.ready {
        state.ready = true;
        events.push(Event::Ready);
    }
}

fn whois_entry<'a>(state: &'a mut ClientState, nick: Option<&str>) -> &'a mut Whois {
    let nick = nick.unwrap_or_default();
    state
        .whois
        .entry(nick.to_string())
        .or_insert_with(|| Whois::new(nick))
}

/// Split one NAMES roster entry into its role and nickname. The first
/// sigil wins; any further sigils (multi-prefix) are stripped.
fn parse_names_entry(entry: &str) -> Option<(Role, &str)> {
    let mut role = Role::Member;
    let mut rest = entry;
    while let Some(c) = rest.chars().next() {
        match Role::from_sigil(c) {
            Some(r) => {
                if role == Role::Member {
                    role = r;
                }
                rest = &rest[c.len_utf8()..];
            }
            None => break,
        }
    }
    if rest.is_empty() {
        None
    } else {
        Some((role, rest))
    }
}

// ---- the engine task ---------------------------------------------------

async fn write_line(client: &Client, conn: &mut dyn Connection, line: String) -> bool {
    match conn.send(&line).await {
        Ok(()) => {
            client.emit(Event::LineSent(line));
            true
        }
        Err(e) => {
            client.state_lock().errored = true;
            client.emit(Event::Error {
                origin: ErrorOrigin::Transport,
                text: e.to_string(),
            });
            false
        }
    }
}

async fn tear_down(client: &Client, conn: &mut dyn Connection) {
    if let Err(e) = conn.disconnect().await {
        debug!("transport close failed: {}", e);
    }
    *client
        .shared
        .outbound
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = None;
    client.state_lock().connected = false;
    client.emit(Event::Disconnect);
}

async fn run(
    client: Client,
    mut conn: Box<dyn Connection>,
    mut queue_rx: mpsc::UnboundedReceiver<String>,
    mut now_rx: mpsc::UnboundedReceiver<String>,
    mut shutdown_rx: mpsc::UnboundedReceiver<(Option<String>, oneshot::Sender<()>)>,
) {
    let mut lines = conn.incoming();
    let mut tick = tokio::time::interval(client.shared.config.send_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut shutdown_ack: Option<oneshot::Sender<()>> = None;

    loop {
        tokio::select! {
            biased;

            Some((reason, ack)) = shutdown_rx.recv() => {
                let quit = match reason {
                    Some(reason) => format!("QUIT :{}", reason),
                    None => "QUIT".to_string(),
                };
                if conn.send(&quit).await.is_ok() {
                    client.emit(Event::LineSent(quit));
                }
                tear_down(&client, conn.as_mut()).await;
                shutdown_ack = Some(ack);
                break;
            }

            Some(line) = now_rx.recv() => {
                if !write_line(&client, conn.as_mut(), line).await {
                    tear_down(&client, conn.as_mut()).await;
                    break;
                }
            }

            inbound = lines.next() => match inbound {
                Some(Ok(line)) => {
                    if client.handle_line(&line) == Flow::Teardown {
                        tear_down(&client, conn.as_mut()).await;
                        break;
                    }
                }
                Some(Err(e)) => {
                    client.state_lock().errored = true;
                    client.emit(Event::Error {
                        origin: ErrorOrigin::Transport,
                        text: e.to_string(),
                    });
                    tear_down(&client, conn.as_mut()).await;
                    break;
                }
                None => {
                    tear_down(&client, conn.as_mut()).await;
                    break;
                }
            },

            _ = tick.tick() => {
                if let Ok(line) = queue_rx.try_recv() {
                    if !write_line(&client, conn.as_mut(), line).await {
                        tear_down(&client, conn.as_mut()).await;
                        break;
                    }
                }
            }
        }
    }

    drop(lines);
    client
        .shared
        .connection
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(conn);
    if let Some(ack) = shutdown_ack {
        let _ = ack.send(());
    }
}
