//! Capabilities consumed from the extension host.
//!
//! The host owns the command palette, the notification subsystem, terminal
//! processes, and status bar rendering. Plugins only see them through the
//! [`Host`] trait. [`RecordingHost`] is an in-memory implementation for tests
//! and local runs.

mod recording;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::disposable::Disposable;
use crate::error::HostError;
use crate::traits::Dispose;

pub use recording::{
    HostCall, RecordedStatusBarItem, RecordedTerminal, RecordingHost, StatusBarItemState,
    TerminalState,
};

/// Static descriptor of a command contributed by a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    pub id: &'static str,
    pub label: &'static str,
}

impl Command {
    pub const fn new(id: &'static str, label: &'static str) -> Self {
        Self { id, label }
    }
}

/// Callback invoked when a command is executed, with the caller's arguments.
pub type CommandHandler = Arc<dyn Fn(&[Value]) -> Result<(), HostError> + Send + Sync>;

/// Boxes a closure as a [`CommandHandler`].
pub fn command_handler<F>(handler: F) -> CommandHandler
where
    F: Fn(&[Value]) -> Result<(), HostError> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Callback invoked when a terminal closes.
pub type TerminalCloseHandler = Arc<dyn Fn(Arc<dyn Terminal>) + Send + Sync>;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Information,
    Warning,
    Error,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageKind::Information => "information",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
        })
    }
}

/// Presentation options for a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageOptions {
    /// Show as a blocking dialog instead of a toast
    pub modal: bool,
}

impl MessageOptions {
    pub const fn modal() -> Self {
        Self { modal: true }
    }
}

/// An action button offered with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageItem {
    pub title: String,
    /// Selected implicitly when the dialog is dismissed
    pub is_close_affordance: bool,
}

impl MessageItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            is_close_affordance: false,
        }
    }

    pub fn close_affordance(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            is_close_affordance: true,
        }
    }
}

/// How a terminal should be started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalOptions {
    pub name: String,
    pub shell_path: Option<String>,
    pub shell_args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

impl TerminalOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn shell(mut self, path: impl Into<String>) -> Self {
        self.shell_path = Some(path.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shell_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Side of the status bar an item is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBarAlignment {
    Left,
    Right,
}

/// A terminal owned by the host.
///
/// Disposing a terminal kills its process and fires the host's close event.
#[async_trait]
pub trait Terminal: Dispose {
    fn name(&self) -> String;

    fn show(&self) -> Result<(), HostError>;

    fn hide(&self) -> Result<(), HostError>;

    /// Writes `text` to the terminal's input.
    fn send_text(&self, text: &str) -> Result<(), HostError>;

    /// Resolves once the host has started the shell process.
    async fn process_id(&self) -> Result<u32, HostError>;
}

/// A status bar entry owned by the host.
pub trait StatusBarItem: Dispose {
    fn set_text(&self, text: &str);

    fn set_tooltip(&self, tooltip: Option<&str>);

    fn set_color(&self, color: Option<&str>);

    fn show(&self) -> Result<(), HostError>;

    fn hide(&self) -> Result<(), HostError>;
}

/// The host capabilities a plugin may call.
///
/// Every operation that acquires something returns either a [`Disposable`]
/// or a handle implementing [`Dispose`]; the plugin is expected to register
/// those with its registry.
#[async_trait]
pub trait Host: Send + Sync {
    /// Adds `command` to the command palette.
    ///
    /// The returned disposable unregisters it.
    fn register_command(&self, command: Command, handler: CommandHandler)
        -> Result<Disposable, HostError>;

    /// Shows a notification and resolves with the selected item, if any.
    async fn show_message(
        &self,
        kind: MessageKind,
        text: &str,
        options: MessageOptions,
        items: Vec<MessageItem>,
    ) -> Result<Option<MessageItem>, HostError>;

    fn create_terminal(&self, options: TerminalOptions) -> Result<Arc<dyn Terminal>, HostError>;

    /// Subscribes to terminal close events.
    ///
    /// With `process_id` set, only the terminal running that process is reported.
    fn on_did_close_terminal(
        &self,
        handler: TerminalCloseHandler,
        process_id: Option<u32>,
    ) -> Result<Disposable, HostError>;

    /// Shows `text` in the status bar until `timeout` elapses or the
    /// returned disposable is released.
    fn set_status_bar_message(
        &self,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<Disposable, HostError>;

    fn create_status_bar_item(
        &self,
        alignment: StatusBarAlignment,
        priority: i32,
    ) -> Result<Arc<dyn StatusBarItem>, HostError>;
}
