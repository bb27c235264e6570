//! Client-side sync controller for a live markdown preview.
//!
//! The crate holds no I/O: a [`session::Session`] reacts to server frames,
//! key presses and channel events, mutates the page through
//! [`page::PagePort`] and returns the requests a runtime must perform.

pub mod channel;
pub mod fragment;
pub mod keys;
pub mod page;
pub mod protocol;
pub mod reconcile;
pub mod session;
pub mod stylesheet;

pub use channel::{ChannelEvent, ChannelState, ConnectionMode, SyncMode};
pub use page::{LinkHandle, PagePort, ScrollBehavior, ScrollTarget, STYLESHEET_ID};
pub use protocol::{decode, encode, ClientCommand, DecodeError, ServerMessage};
pub use reconcile::{PostProcessPolicy, ReconcileError};
pub use session::{Outbound, Session, SessionOptions};
pub use stylesheet::{StylesheetReference, StylesheetSwitcher};
