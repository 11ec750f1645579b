//! In-memory host that records every call a plugin makes.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{
    Command, CommandHandler, Host, MessageItem, MessageKind, MessageOptions, StatusBarAlignment,
    StatusBarItem, Terminal, TerminalCloseHandler, TerminalOptions,
};
use crate::disposable::{Disposable, DisposableKind};
use crate::error::HostError;
use crate::traits::Dispose;

const FIRST_PROCESS_ID: u32 = 1000;

/// One observable interaction between a plugin and the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    RegisterCommand { id: String },
    UnregisterCommand { id: String },
    ExecuteCommand { id: String, args: Vec<Value> },
    ShowMessage { kind: MessageKind, text: String, modal: bool, items: Vec<String> },
    CreateTerminal { process_id: u32, name: String, shell_path: Option<String>, shell_args: Vec<String> },
    ShowTerminal { process_id: u32 },
    HideTerminal { process_id: u32 },
    SendText { process_id: u32, text: String },
    DisposeTerminal { process_id: u32 },
    SubscribeTerminalClose { process_id: Option<u32> },
    UnsubscribeTerminalClose { process_id: Option<u32> },
    SetStatusBarMessage { text: String, timeout: Option<Duration> },
    ClearStatusBarMessage { text: String },
    CreateStatusBarItem { item: u64, alignment: StatusBarAlignment, priority: i32 },
    ShowStatusBarItem { item: u64 },
    HideStatusBarItem { item: u64 },
    DisposeStatusBarItem { item: u64 },
}

struct CloseSubscription {
    id: u64,
    process_id: Option<u32>,
    handler: TerminalCloseHandler,
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<HostCall>>,
    commands: Mutex<Vec<(String, CommandHandler)>>,
    close_subscriptions: Mutex<Vec<CloseSubscription>>,
    terminals: Mutex<Vec<Arc<RecordedTerminal>>>,
    status_messages: Mutex<Vec<(u64, String)>>,
    status_items: Mutex<Vec<Arc<RecordedStatusBarItem>>>,
    modal_answer: Mutex<Option<String>>,
    fail_terminals: AtomicBool,
    next_process_id: AtomicU32,
    next_id: AtomicU64,
}

impl Shared {
    fn record(&self, call: HostCall) {
        log::trace!("host call: {:?}", call);
        self.calls.lock().push(call);
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::AcqRel)
    }

    fn fire_terminal_closed(&self, terminal: Arc<dyn Terminal>, process_id: u32) {
        // Handlers run outside the lock; they may subscribe or unsubscribe.
        let handlers: Vec<TerminalCloseHandler> = self
            .close_subscriptions
            .lock()
            .iter()
            .filter(|s| s.process_id.map_or(true, |pid| pid == process_id))
            .map(|s| s.handler.clone())
            .collect();
        for handler in handlers {
            handler(terminal.clone());
        }
    }
}

/// A [`Host`] implementation that keeps everything in memory.
///
/// Every call is appended to a log available through [`calls`](Self::calls).
/// Commands can be triggered with [`execute_command`](Self::execute_command)
/// and terminals closed with [`close_terminal`](Self::close_terminal), which
/// fires the registered close handlers just like a user closing the panel.
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::host::{command_handler, Command, Host, HostCall, RecordingHost};
///
/// let host = RecordingHost::new();
/// let hello = Command::new("hello", "Say hello");
/// let registration = host
///     .register_command(hello, command_handler(|_args| Ok(())))
///     .unwrap();
///
/// host.execute_command("hello", vec![]).unwrap();
/// registration.release().unwrap();
/// assert!(host.execute_command("hello", vec![]).is_err());
/// assert_eq!(host.calls()[0], HostCall::RegisterCommand { id: "hello".into() });
/// ```
#[derive(Clone)]
pub struct RecordingHost {
    shared: Arc<Shared>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHost {
    pub fn new() -> Self {
        let shared = Shared {
            next_process_id: AtomicU32::new(FIRST_PROCESS_ID),
            ..Shared::default()
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Every call recorded so far, in order.
    pub fn calls(&self) -> Vec<HostCall> {
        self.shared.calls.lock().clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.shared.calls.lock().clear();
    }

    /// Ids of currently registered commands, in registration order.
    pub fn registered_commands(&self) -> Vec<String> {
        self.shared.commands.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    /// Invokes the handler registered for `id`.
    ///
    /// # Errors
    ///
    /// Fails when no such command is registered, or with the handler's error.
    pub fn execute_command(&self, id: &str, args: Vec<Value>) -> Result<(), HostError> {
        let handler = self
            .shared
            .commands
            .lock()
            .iter()
            .find(|(registered, _)| registered == id)
            .map(|(_, handler)| handler.clone())
            .ok_or_else(|| HostError::new(format!("command '{}' not found", id)))?;
        self.shared.record(HostCall::ExecuteCommand { id: id.to_string(), args: args.clone() });
        handler(&args)
    }

    /// Title of the item modal messages should resolve with.
    ///
    /// `None` (the default) behaves like the user dismissing the dialog.
    pub fn set_modal_answer(&self, title: Option<&str>) {
        *self.shared.modal_answer.lock() = title.map(str::to_string);
    }

    /// Makes subsequent `create_terminal` calls fail.
    pub fn fail_terminal_creation(&self, fail: bool) {
        self.shared.fail_terminals.store(fail, Ordering::Release);
    }

    /// Every terminal created so far, disposed or not.
    pub fn terminals(&self) -> Vec<Arc<RecordedTerminal>> {
        self.shared.terminals.lock().clone()
    }

    pub fn terminal(&self, process_id: u32) -> Option<Arc<RecordedTerminal>> {
        self.shared
            .terminals
            .lock()
            .iter()
            .find(|t| t.process_id == process_id)
            .cloned()
    }

    /// Closes the terminal running `process_id`, as if the user closed it.
    ///
    /// # Errors
    ///
    /// Fails when no terminal runs that process.
    pub fn close_terminal(&self, process_id: u32) -> Result<(), HostError> {
        let terminal = self
            .terminal(process_id)
            .ok_or_else(|| HostError::new(format!("no terminal with process id {}", process_id)))?;
        terminal.dispose()
    }

    /// Number of live terminal-close subscriptions.
    pub fn close_subscription_count(&self) -> usize {
        self.shared.close_subscriptions.lock().len()
    }

    /// Status bar messages currently displayed, oldest first.
    pub fn status_messages(&self) -> Vec<String> {
        self.shared.status_messages.lock().iter().map(|(_, text)| text.clone()).collect()
    }

    /// Every status bar item created so far.
    pub fn status_bar_items(&self) -> Vec<Arc<RecordedStatusBarItem>> {
        self.shared.status_items.lock().clone()
    }
}

#[async_trait]
impl Host for RecordingHost {
    fn register_command(
        &self,
        command: Command,
        handler: CommandHandler,
    ) -> Result<Disposable, HostError> {
        {
            let mut commands = self.shared.commands.lock();
            if commands.iter().any(|(id, _)| id == command.id) {
                return Err(HostError::new(format!("command '{}' already exists", command.id)));
            }
            commands.push((command.id.to_string(), handler));
        }
        self.shared.record(HostCall::RegisterCommand { id: command.id.to_string() });

        let shared = Arc::downgrade(&self.shared);
        let id = command.id.to_string();
        Ok(Disposable::new(DisposableKind::Command, format!("command:{}", command.id), move || {
            if let Some(shared) = shared.upgrade() {
                shared.commands.lock().retain(|(registered, _)| *registered != id);
                shared.record(HostCall::UnregisterCommand { id });
            }
            Ok(())
        }))
    }

    async fn show_message(
        &self,
        kind: MessageKind,
        text: &str,
        options: MessageOptions,
        items: Vec<MessageItem>,
    ) -> Result<Option<MessageItem>, HostError> {
        self.shared.record(HostCall::ShowMessage {
            kind,
            text: text.to_string(),
            modal: options.modal,
            items: items.iter().map(|i| i.title.clone()).collect(),
        });

        let answer = self.shared.modal_answer.lock().clone();
        let selected = match answer {
            Some(title) if options.modal => items.into_iter().find(|i| i.title == title),
            // Dismissing a modal dialog picks the close affordance.
            None if options.modal => items.into_iter().find(|i| i.is_close_affordance),
            _ => None,
        };
        Ok(selected)
    }

    fn create_terminal(&self, options: TerminalOptions) -> Result<Arc<dyn Terminal>, HostError> {
        if self.shared.fail_terminals.load(Ordering::Acquire) {
            return Err(HostError::new(format!("cannot spawn terminal '{}'", options.name)));
        }

        let process_id = self.shared.next_process_id.fetch_add(1, Ordering::AcqRel);
        self.shared.record(HostCall::CreateTerminal {
            process_id,
            name: options.name.clone(),
            shell_path: options.shell_path.clone(),
            shell_args: options.shell_args.clone(),
        });

        let shared = Arc::downgrade(&self.shared);
        let terminal = Arc::new_cyclic(|this| RecordedTerminal {
            this: this.clone(),
            shared,
            process_id,
            options,
            state: Mutex::new(TerminalState::default()),
        });
        self.shared.terminals.lock().push(terminal.clone());
        Ok(terminal)
    }

    fn on_did_close_terminal(
        &self,
        handler: TerminalCloseHandler,
        process_id: Option<u32>,
    ) -> Result<Disposable, HostError> {
        let id = self.shared.next_id();
        self.shared
            .close_subscriptions
            .lock()
            .push(CloseSubscription { id, process_id, handler });
        self.shared.record(HostCall::SubscribeTerminalClose { process_id });

        let shared = Arc::downgrade(&self.shared);
        let label = match process_id {
            Some(pid) => format!("on-did-close-terminal:{}", pid),
            None => "on-did-close-terminal".to_string(),
        };
        Ok(Disposable::new(DisposableKind::Subscription, label, move || {
            if let Some(shared) = shared.upgrade() {
                shared.close_subscriptions.lock().retain(|s| s.id != id);
                shared.record(HostCall::UnsubscribeTerminalClose { process_id });
            }
            Ok(())
        }))
    }

    fn set_status_bar_message(
        &self,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<Disposable, HostError> {
        let id = self.shared.next_id();
        self.shared.status_messages.lock().push((id, text.to_string()));
        self.shared.record(HostCall::SetStatusBarMessage { text: text.to_string(), timeout });

        let shared = Arc::downgrade(&self.shared);
        let text = text.to_string();
        Ok(Disposable::new(DisposableKind::Widget, format!("status-message:{}", text), move || {
            if let Some(shared) = shared.upgrade() {
                shared.status_messages.lock().retain(|(message, _)| *message != id);
                shared.record(HostCall::ClearStatusBarMessage { text });
            }
            Ok(())
        }))
    }

    fn create_status_bar_item(
        &self,
        alignment: StatusBarAlignment,
        priority: i32,
    ) -> Result<Arc<dyn StatusBarItem>, HostError> {
        let id = self.shared.next_id();
        self.shared.record(HostCall::CreateStatusBarItem { item: id, alignment, priority });
        let item = Arc::new(RecordedStatusBarItem {
            id,
            alignment,
            priority,
            shared: Arc::downgrade(&self.shared),
            state: Mutex::new(StatusBarItemState::default()),
        });
        self.shared.status_items.lock().push(item.clone());
        Ok(item)
    }
}

/// Observable state of a [`RecordedTerminal`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalState {
    pub visible: bool,
    pub disposed: bool,
    pub sent: Vec<String>,
}

/// Terminal handed out by [`RecordingHost`].
pub struct RecordedTerminal {
    this: Weak<RecordedTerminal>,
    shared: Weak<Shared>,
    process_id: u32,
    options: TerminalOptions,
    state: Mutex<TerminalState>,
}

impl RecordedTerminal {
    pub fn options(&self) -> &TerminalOptions {
        &self.options
    }

    pub fn pid(&self) -> u32 {
        self.process_id
    }

    pub fn state(&self) -> TerminalState {
        self.state.lock().clone()
    }

    fn record(&self, call: HostCall) {
        if let Some(shared) = self.shared.upgrade() {
            shared.record(call);
        }
    }

    fn ensure_alive(&self) -> Result<(), HostError> {
        if self.state.lock().disposed {
            Err(HostError::new(format!("terminal {} is disposed", self.process_id)))
        } else {
            Ok(())
        }
    }
}

impl Dispose for RecordedTerminal {
    fn dispose(&self) -> Result<(), HostError> {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
            state.visible = false;
        }
        self.record(HostCall::DisposeTerminal { process_id: self.process_id });

        if let (Some(shared), Some(this)) = (self.shared.upgrade(), self.this.upgrade()) {
            shared.fire_terminal_closed(this, self.process_id);
        }
        Ok(())
    }
}

#[async_trait]
impl Terminal for RecordedTerminal {
    fn name(&self) -> String {
        self.options.name.clone()
    }

    fn show(&self) -> Result<(), HostError> {
        self.ensure_alive()?;
        self.state.lock().visible = true;
        self.record(HostCall::ShowTerminal { process_id: self.process_id });
        Ok(())
    }

    fn hide(&self) -> Result<(), HostError> {
        self.ensure_alive()?;
        self.state.lock().visible = false;
        self.record(HostCall::HideTerminal { process_id: self.process_id });
        Ok(())
    }

    fn send_text(&self, text: &str) -> Result<(), HostError> {
        self.ensure_alive()?;
        self.state.lock().sent.push(text.to_string());
        self.record(HostCall::SendText { process_id: self.process_id, text: text.to_string() });
        Ok(())
    }

    async fn process_id(&self) -> Result<u32, HostError> {
        // Yield once so callers observe the id asynchronously, like a real spawn.
        tokio::task::yield_now().await;
        Ok(self.process_id)
    }
}

/// Observable state of a [`RecordedStatusBarItem`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBarItemState {
    pub text: String,
    pub tooltip: Option<String>,
    pub color: Option<String>,
    pub visible: bool,
    pub disposed: bool,
}

/// Status bar item handed out by [`RecordingHost`].
pub struct RecordedStatusBarItem {
    id: u64,
    alignment: StatusBarAlignment,
    priority: i32,
    shared: Weak<Shared>,
    state: Mutex<StatusBarItemState>,
}

impl RecordedStatusBarItem {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn alignment(&self) -> StatusBarAlignment {
        self.alignment
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn state(&self) -> StatusBarItemState {
        self.state.lock().clone()
    }

    fn record(&self, call: HostCall) {
        if let Some(shared) = self.shared.upgrade() {
            shared.record(call);
        }
    }
}

impl Dispose for RecordedStatusBarItem {
    fn dispose(&self) -> Result<(), HostError> {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
            state.visible = false;
        }
        self.record(HostCall::DisposeStatusBarItem { item: self.id });
        Ok(())
    }
}

impl StatusBarItem for RecordedStatusBarItem {
    fn set_text(&self, text: &str) {
        self.state.lock().text = text.to_string();
    }

    fn set_tooltip(&self, tooltip: Option<&str>) {
        self.state.lock().tooltip = tooltip.map(str::to_string);
    }

    fn set_color(&self, color: Option<&str>) {
        self.state.lock().color = color.map(str::to_string);
    }

    fn show(&self) -> Result<(), HostError> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(HostError::new(format!("status bar item {} is disposed", self.id)));
        }
        state.visible = true;
        drop(state);
        self.record(HostCall::ShowStatusBarItem { item: self.id });
        Ok(())
    }

    fn hide(&self) -> Result<(), HostError> {
        self.state.lock().visible = false;
        self.record(HostCall::HideStatusBarItem { item: self.id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_command_ids_are_rejected() {
        let host = RecordingHost::new();
        let command = Command::new("dup", "Duplicate");
        let _first = host.register_command(command, crate::host::command_handler(|_| Ok(()))).unwrap();
        let err = host.register_command(command, crate::host::command_handler(|_| Ok(()))).unwrap_err();
        assert!(err.message().contains("already exists"));
    }

    #[test]
    fn closing_a_terminal_respects_the_process_filter() {
        let host = RecordingHost::new();
        let a = host.create_terminal(TerminalOptions::new("a")).unwrap();
        let _b = host.create_terminal(TerminalOptions::new("b")).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = host
            .on_did_close_terminal(
                Arc::new(move |term: Arc<dyn Terminal>| seen_clone.lock().push(term.name())),
                Some(FIRST_PROCESS_ID + 1),
            )
            .unwrap();

        a.dispose().unwrap();
        assert!(seen.lock().is_empty());

        host.close_terminal(FIRST_PROCESS_ID + 1).unwrap();
        assert_eq!(*seen.lock(), vec!["b".to_string()]);

        // Closing twice is harmless.
        host.close_terminal(FIRST_PROCESS_ID + 1).unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn disposed_terminal_rejects_input() {
        let host = RecordingHost::new();
        let terminal = host.create_terminal(TerminalOptions::new("t")).unwrap();
        terminal.dispose().unwrap();
        assert!(terminal.send_text("ls").is_err());
        assert!(terminal.show().is_err());
    }

    #[test]
    fn status_messages_clear_on_release() {
        let host = RecordingHost::new();
        let message = host.set_status_bar_message("Building", None).unwrap();
        assert_eq!(host.status_messages(), vec!["Building"]);
        message.release().unwrap();
        assert!(host.status_messages().is_empty());
    }

    #[tokio::test]
    async fn modal_messages_resolve_with_configured_answer() {
        let host = RecordingHost::new();
        let items = vec![MessageItem::new("one"), MessageItem::close_affordance("two")];

        let dismissed = host
            .show_message(MessageKind::Information, "pick", MessageOptions::modal(), items.clone())
            .await
            .unwrap();
        assert_eq!(dismissed.map(|i| i.title), Some("two".to_string()));

        host.set_modal_answer(Some("one"));
        let picked = host
            .show_message(MessageKind::Information, "pick", MessageOptions::modal(), items.clone())
            .await
            .unwrap();
        assert_eq!(picked.map(|i| i.title), Some("one".to_string()));

        let toast = host
            .show_message(MessageKind::Warning, "toast", MessageOptions::default(), items)
            .await
            .unwrap();
        assert!(toast.is_none());
    }
}
