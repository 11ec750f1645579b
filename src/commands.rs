//! Command descriptors contributed by the sample plugin.

use crate::host::Command;

pub const SIMPLE_COMMAND: Command =
    Command::new("simple-backend-plugin-command", "Command from simple server plugin");

pub const INFORMATION_MESSAGE: Command = Command::new(
    "backend-plugin-information-message-command",
    "Test Information Message Server Plugin Item",
);

pub const INFORMATION_MODAL_MESSAGE: Command = Command::new(
    "backend-plugin-information-modal-message-command",
    "Test Information Modal Message Server Plugin Item",
);

pub const WARNING_MESSAGE: Command = Command::new(
    "backend-plugin-warning-message-command",
    "Test Warning Message Server Plugin Item",
);

pub const WARNING_MODAL_MESSAGE: Command = Command::new(
    "backend-plugin-warning-modal-message-command",
    "Test Warning Modal Message Server Plugin Item",
);

pub const ERROR_MESSAGE: Command = Command::new(
    "backend-plugin-error-message-command",
    "Test Error Message Server Plugin Item",
);

pub const ERROR_MODAL_MESSAGE: Command = Command::new(
    "backend-plugin-error-modal-message-command",
    "Test Error Modal Message Server Plugin Item",
);

pub const CREATE_TERMINAL_WITH_ARGS: Command = Command::new(
    "backend-plugin-terminal-created-with-help-args",
    "Create terminal with help arguments Server plugin",
);

pub const CREATE_TERMINAL_WITH_OPTIONS: Command = Command::new(
    "backend-plugin-terminal-created-with-help-options",
    "Create terminal with help options Server plugin",
);

pub const SEND_TEXT_TO_TERMINAL: Command = Command::new(
    "backend-plugin-send-text-to-the-terminal",
    "Send text to the terminal Server plugin",
);

pub const HIDE_TERMINAL_PANEL: Command = Command::new(
    "backend-plugin-hide-terminal-panel",
    "Hide terminal panel after delay Server plugin",
);

pub const SHOW_TERMINAL_WITH_DELAY: Command = Command::new(
    "backend-plugin-show-terminal-with-delay",
    "Show terminal after delay Server plugin",
);

pub const DISPOSE_TERMINAL: Command = Command::new(
    "backend-plugin-dispose-terminal",
    "Dispose terminal after delay Server plugin",
);

pub const SUBSCRIBE_TERMINAL_CLOSE: Command = Command::new(
    "backend-plugin-subscribe-on-did-close-terminal-event",
    "Subscribe to onDidCloseTerminal event Server plugin",
);

pub const STATUS_BAR_MESSAGE: Command = Command::new(
    "backend-plugin-status-bar-message",
    "Show status bar message Server plugin",
);

pub const STATUS_BAR_MESSAGE_WITH_TIMEOUT: Command = Command::new(
    "backend-plugin-status-bar-message-with-timeout",
    "Show status bar message with timeout Server plugin",
);

pub const STATUS_BAR_ITEM: Command = Command::new(
    "backend-plugin-status-bar-item",
    "Create status bar item Server plugin",
);

/// Every command, in registration order.
pub const ALL: [Command; 17] = [
    SIMPLE_COMMAND,
    INFORMATION_MESSAGE,
    INFORMATION_MODAL_MESSAGE,
    WARNING_MESSAGE,
    WARNING_MODAL_MESSAGE,
    ERROR_MESSAGE,
    ERROR_MODAL_MESSAGE,
    CREATE_TERMINAL_WITH_ARGS,
    CREATE_TERMINAL_WITH_OPTIONS,
    SEND_TEXT_TO_TERMINAL,
    HIDE_TERMINAL_PANEL,
    SHOW_TERMINAL_WITH_DELAY,
    DISPOSE_TERMINAL,
    SUBSCRIBE_TERMINAL_CLOSE,
    STATUS_BAR_MESSAGE,
    STATUS_BAR_MESSAGE_WITH_TIMEOUT,
    STATUS_BAR_ITEM,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn command_ids_are_unique() {
        let ids: HashSet<_> = ALL.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), ALL.len());
    }
}
