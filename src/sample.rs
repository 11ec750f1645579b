//! Sample plugin exercising the notification, terminal and status bar APIs.
//!
//! Every command registration goes into the context's registry, so
//! deactivation unregisters the whole palette in reverse order. Deferred
//! terminal actions run through the context's [`Scheduler`](crate::Scheduler)
//! and are cancelled on deactivation.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::commands;
use crate::disposable::{Disposable, DisposableKind};
use crate::error::{HostError, LifecycleResult};
use crate::host::{
    command_handler, Command, MessageItem, MessageKind, MessageOptions, StatusBarAlignment, Terminal,
    TerminalCloseHandler, TerminalOptions,
};
use crate::plugin::{Plugin, PluginContext};

const STATUS_BAR_ITEM_PRIORITY: i32 = 100;

/// The sample plugin.
///
/// Besides logging, it remembers the process ids of terminals whose close
/// event it observed, which is handy when driving it from tests.
#[derive(Default)]
pub struct SamplePlugin {
    closed_terminals: Arc<Mutex<Vec<u32>>>,
}

impl SamplePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process ids reported by the terminal-close subscriptions, in order.
    pub fn closed_terminals(&self) -> Vec<u32> {
        self.closed_terminals.lock().clone()
    }
}

impl Plugin for SamplePlugin {
    fn id(&self) -> &str {
        "sample-backend-plugin"
    }

    fn activate(&self, ctx: &PluginContext) -> LifecycleResult<()> {
        register(ctx, commands::SIMPLE_COMMAND, |_, args| {
            log::info!(">>> Simple plugin command handler was called with arguments: {:?}", args);
            Ok(())
        })?;

        register_message(ctx, commands::INFORMATION_MESSAGE, MessageKind::Information, false)?;
        register(ctx, commands::INFORMATION_MODAL_MESSAGE, |ctx, _| {
            let items = vec![
                MessageItem::new("action1"),
                MessageItem::close_affordance("action2"),
                MessageItem::new("action3"),
            ];
            show_message(ctx, MessageKind::Information, "Information modal message!", MessageOptions::modal(), items)
        })?;
        register_message(ctx, commands::WARNING_MESSAGE, MessageKind::Warning, false)?;
        register_message(ctx, commands::WARNING_MODAL_MESSAGE, MessageKind::Warning, true)?;
        register_message(ctx, commands::ERROR_MESSAGE, MessageKind::Error, false)?;
        register_message(ctx, commands::ERROR_MODAL_MESSAGE, MessageKind::Error, true)?;

        register(ctx, commands::CREATE_TERMINAL_WITH_ARGS, |ctx, _| {
            let options = TerminalOptions::new("Sh Terminal").shell("sh").args(["-l"]);
            let terminal = ctx.host().create_terminal(options)?;
            terminal.show()
        })?;
        register(ctx, commands::CREATE_TERMINAL_WITH_OPTIONS, |ctx, _| {
            let config = ctx.config();
            let options = TerminalOptions::new(config.terminal_name.clone())
                .shell(config.default_shell.clone())
                .args(["-l"])
                .env_var("HELLO", "Hello from the plugin.");
            let terminal = ctx.host().create_terminal(options)?;
            terminal.show()
        })?;
        register(ctx, commands::SEND_TEXT_TO_TERMINAL, |ctx, _| {
            let terminal = create_default_terminal(ctx)?;
            terminal.show()?;
            terminal.send_text("clear && echo Plugin terminal.\n")
        })?;

        register(ctx, commands::HIDE_TERMINAL_PANEL, |ctx, _| {
            let terminal = create_default_terminal(ctx)?;
            terminal.show()?;
            defer(ctx, "hide-terminal", terminal, |t| t.hide())
        })?;
        register(ctx, commands::SHOW_TERMINAL_WITH_DELAY, |ctx, _| {
            let terminal = create_default_terminal(ctx)?;
            defer(ctx, "show-terminal", terminal, |t| t.show())
        })?;
        register(ctx, commands::DISPOSE_TERMINAL, |ctx, _| {
            let terminal = create_default_terminal(ctx)?;
            terminal.show()?;
            defer(ctx, "dispose-terminal", terminal, |t| t.dispose())
        })?;

        let closed = self.closed_terminals.clone();
        register(ctx, commands::SUBSCRIBE_TERMINAL_CLOSE, move |ctx, _| {
            let terminal = create_default_terminal(ctx)?;
            terminal.show()?;
            subscribe_to_close(ctx, terminal, closed.clone())
        })?;

        register(ctx, commands::STATUS_BAR_MESSAGE, |ctx, _| {
            let message = ctx.host().set_status_bar_message("Status bar message!", None)?;
            ctx.subscribe(message);
            Ok(())
        })?;
        register(ctx, commands::STATUS_BAR_MESSAGE_WITH_TIMEOUT, |ctx, _| {
            let timeout = ctx.config().status_message_timeout;
            let message = ctx
                .host()
                .set_status_bar_message("Status bar message with timeout!", Some(timeout))?;
            ctx.subscribe(message);
            Ok(())
        })?;
        register(ctx, commands::STATUS_BAR_ITEM, |ctx, _| {
            let item = ctx
                .host()
                .create_status_bar_item(StatusBarAlignment::Left, STATUS_BAR_ITEM_PRIORITY)?;
            item.set_text("Plugin item");
            item.set_tooltip(Some("Created by the sample plugin"));
            item.set_color(Some("#7fba00"));
            item.show()?;
            ctx.subscribe(Disposable::from_dispose(DisposableKind::Widget, "status-bar-item", item));
            Ok(())
        })?;

        Ok(())
    }
}

/// Registers `command` with the host and tracks its registration.
fn register<F>(ctx: &PluginContext, command: Command, handler: F) -> LifecycleResult<()>
where
    F: Fn(&PluginContext, &[Value]) -> Result<(), HostError> + Send + Sync + 'static,
{
    let handler_ctx = ctx.clone();
    let registration = ctx.host().register_command(
        command,
        command_handler(move |args| {
            handler(&handler_ctx, args).map_err(|err| {
                log::error!("Command {} failed: {}", command.id, err);
                err
            })
        }),
    )?;
    ctx.subscribe(registration);
    Ok(())
}

fn register_message(
    ctx: &PluginContext,
    command: Command,
    kind: MessageKind,
    modal: bool,
) -> LifecycleResult<()> {
    let text = match (kind, modal) {
        (MessageKind::Information, false) => "Information message!",
        (MessageKind::Information, true) => "Information modal message!",
        (MessageKind::Warning, false) => "Warning message!",
        (MessageKind::Warning, true) => "Warning modal message!",
        (MessageKind::Error, false) => "Error message!",
        (MessageKind::Error, true) => "Error modal message!",
    };
    let options = MessageOptions { modal };
    register(ctx, command, move |ctx, _| show_message(ctx, kind, text, options, Vec::new()))
}

/// Shows a message without blocking the command; the answer is logged.
fn show_message(
    ctx: &PluginContext,
    kind: MessageKind,
    text: &str,
    options: MessageOptions,
    items: Vec<MessageItem>,
) -> Result<(), HostError> {
    let host = ctx.host().clone();
    let text = text.to_string();
    // The task is cancelled with the scheduler; its handle is not tracked.
    let _task = ctx.scheduler().spawn(format!("{}-message", kind), async move {
        match host.show_message(kind, &text, options, items).await {
            Ok(Some(item)) => log::info!(">>> resolve {}", item.title),
            Ok(None) => log::debug!(">>> {} message dismissed", kind),
            Err(err) => log::error!("Failed to show {} message: {}", kind, err),
        }
    })?;
    Ok(())
}

fn create_default_terminal(ctx: &PluginContext) -> Result<Arc<dyn Terminal>, HostError> {
    let config = ctx.config();
    let options = TerminalOptions::new(config.terminal_name.clone()).shell(config.default_shell.clone());
    ctx.host().create_terminal(options)
}

/// Runs `action` on `terminal` after the configured delay.
fn defer<F>(ctx: &PluginContext, label: &str, terminal: Arc<dyn Terminal>, action: F) -> Result<(), HostError>
where
    F: FnOnce(&dyn Terminal) -> Result<(), HostError> + Send + 'static,
{
    let label = label.to_string();
    let task_label = label.clone();
    let _timer = ctx.scheduler().schedule_after(ctx.config().deferred_action_delay, label, move || {
        if let Err(err) = action(&*terminal) {
            log::error!("Deferred {} failed: {}", task_label, err);
        }
    })?;
    Ok(())
}

/// Waits for the terminal's process id, then subscribes to its close event.
///
/// The subscription is acquired after the command returned, so it is added to
/// the registry late rather than during activation.
fn subscribe_to_close(
    ctx: &PluginContext,
    terminal: Arc<dyn Terminal>,
    closed: Arc<Mutex<Vec<u32>>>,
) -> Result<(), HostError> {
    let task_ctx = ctx.clone();
    let _task = ctx.scheduler().spawn("await-terminal-process-id", async move {
        let id = match terminal.process_id().await {
            Ok(id) => id,
            Err(err) => {
                log::error!("Cannot read process id of {}: {}", terminal.name(), err);
                return;
            }
        };

        let scheduler = task_ctx.scheduler().clone();
        let handler: TerminalCloseHandler = Arc::new(move |term: Arc<dyn Terminal>| {
            let closed = closed.clone();
            let spawned = scheduler.spawn("terminal-closed", async move {
                if let Ok(current) = term.process_id().await {
                    if current == id {
                        log::info!("Terminal closed, id: {}", id);
                        closed.lock().push(id);
                    }
                }
            });
            if let Err(err) = spawned {
                log::warn!("Cannot report close of terminal {}: {}", id, err);
            }
        });

        match task_ctx.host().on_did_close_terminal(handler, Some(id)) {
            Ok(subscription) => task_ctx.subscribe(subscription),
            Err(err) => log::error!("Cannot subscribe to close of terminal {}: {}", id, err),
        }
    })?;
    Ok(())
}
