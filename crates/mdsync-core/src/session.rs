//! The owned session state every reaction runs against.
//!
//! A [`Session`] never performs I/O. The channel runtime feeds it inbound
//! frames, key presses and fetch results, and carries out the [`Outbound`]
//! requests it returns.

use tracing::{debug, info, warn};

use crate::channel::{ChannelEvent, ConnectionMode, SyncMode};
use crate::keys::{Action, CommandDispatcher, DEFAULT_SCROLL_STEP};
use crate::page::{PagePort, ScrollBehavior, ScrollTarget};
use crate::protocol::{decode, ClientCommand, DecodeError, ServerMessage};
use crate::reconcile::{ContentReconciler, PostProcessPolicy};
use crate::stylesheet::{StylesheetReference, StylesheetSwitcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub mode: SyncMode,
    pub post_process: PostProcessPolicy,
    pub scroll_step: i64,
}

impl SessionOptions {
    pub fn new(mode: SyncMode) -> Self {
        // The first push update races page setup and arrives untagged.
        let post_process = match mode {
            SyncMode::Push => PostProcessPolicy::SkipFirst,
            SyncMode::Poll => PostProcessPolicy::Always,
        };
        Self {
            mode,
            post_process,
            scroll_step: DEFAULT_SCROLL_STEP,
        }
    }
}

/// Work the runtime must carry out on the session's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send a command over the push connection.
    Command(ClientCommand),
    /// Poll mode: resolve the stylesheet at `offset` and apply it.
    FetchStylesheet { offset: i64 },
    /// Poll mode: post the page markup to the export endpoint.
    ExportMarkup(String),
}

pub struct Session<P> {
    page: P,
    connection: ConnectionMode,
    reconciler: ContentReconciler,
    stylesheets: StylesheetSwitcher,
    dispatcher: CommandDispatcher,
    css_offset: i64,
}

impl<P: PagePort> Session<P> {
    pub fn new(page: P, options: SessionOptions) -> Self {
        Self {
            page,
            connection: ConnectionMode::new(options.mode),
            reconciler: ContentReconciler::new(options.post_process),
            stylesheets: StylesheetSwitcher::new(),
            dispatcher: CommandDispatcher::new(options.scroll_step),
            css_offset: 0,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    pub fn connection(&self) -> ConnectionMode {
        self.connection
    }

    pub fn css_offset(&self) -> i64 {
        self.css_offset
    }

    pub fn updates_applied(&self) -> u64 {
        self.reconciler.applied()
    }

    pub fn on_channel(&mut self, event: ChannelEvent) {
        let next = self.connection.on(event);
        if next != self.connection {
            info!("channel_state: {:?} -> {:?}", self.connection, next);
        }
        self.connection = next;
    }

    /// Decode one inbound frame and apply it. Undecodable frames are dropped.
    pub fn handle_frame(&mut self, raw: &str) -> Result<(), DecodeError> {
        match decode(raw) {
            Ok(message) => {
                self.apply_message(message);
                Ok(())
            }
            Err(err) => {
                warn!("server_msg_decode_error: {err}");
                Err(err)
            }
        }
    }

    pub fn apply_message(&mut self, message: ServerMessage) {
        debug!("server_msg: {}", message.tag());
        match message {
            ServerMessage::HtmlUpdate(body) => self.reconciler.apply_html(&mut self.page, &body),
            ServerMessage::CssUpdate(Some(reference)) | ServerMessage::CssChange(reference) => {
                self.stylesheets.apply(&mut self.page, &reference)
            }
            ServerMessage::CssUpdate(None) => self.stylesheets.refresh(&mut self.page),
            ServerMessage::Success => {}
            ServerMessage::Error(message) => warn!("server_error: {message}"),
        }
    }

    /// Poll mode treats the whole fetched document as an update.
    pub fn apply_poll_body(&mut self, body: &str) {
        self.reconciler.apply_html(&mut self.page, body);
    }

    pub fn apply_stylesheet(&mut self, reference: &StylesheetReference) {
        self.stylesheets.apply(&mut self.page, reference);
    }

    pub fn handle_key(&mut self, key: char) -> Vec<Outbound> {
        let mut outbound = Vec::new();
        for action in self.dispatcher.dispatch(key) {
            match action {
                Action::Send(command) => outbound.extend(self.route(command)),
                Action::ScrollBy(delta, behavior) => self.page.scroll_by(delta, behavior),
                Action::ScrollTo(target, behavior) => self.page.scroll_to(target, behavior),
            }
        }
        outbound
    }

    /// Ask the server to show another markdown file.
    pub fn follow_link(&mut self, href: &str) -> Vec<Outbound> {
        let outbound = self
            .route(ClientCommand::Redirect(href.to_string()))
            .into_iter()
            .collect();
        self.page.scroll_to(ScrollTarget::Top, ScrollBehavior::Instant);
        outbound
    }

    fn route(&mut self, command: ClientCommand) -> Option<Outbound> {
        match self.connection {
            ConnectionMode::Push(state) if state.can_send() => Some(Outbound::Command(command)),
            ConnectionMode::Push(state) => {
                debug!("command_dropped: {} while {:?}", command.tag(), state);
                None
            }
            ConnectionMode::Poll => match command {
                ClientCommand::ChangeCssNext => {
                    self.css_offset += 1;
                    Some(Outbound::FetchStylesheet {
                        offset: self.css_offset,
                    })
                }
                ClientCommand::ChangeCssPrev => {
                    self.css_offset -= 1;
                    Some(Outbound::FetchStylesheet {
                        offset: self.css_offset,
                    })
                }
                ClientCommand::ExportHtml => Some(Outbound::ExportMarkup(self.page.outer_html())),
                ClientCommand::RedirectDefault | ClientCommand::Redirect(_) => {
                    debug!("command_dropped: {} has no poll endpoint", command.tag());
                    None
                }
            },
        }
    }
}
