//! Module `state`
//!
//! Per-session protocol state: login progress, working directory, transfer
//! type and the negotiated data channel. Owned by exactly one worker thread
//! for the lifetime of the control connection.

use std::path::{Path, PathBuf};

use crate::transfer::data_channel::PassiveListener;
use crate::transfer::modes::{DataChannel, TransferMode, TransferType};

/// Login progress. Credentials are never checked; any PASS logs in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoginState {
    #[default]
    Unauthenticated,
    AwaitingPassword(String),
    LoggedIn(String),
}

/// Represents the state of a connected FTP session.
#[derive(Debug)]
pub struct SessionState {
    login: LoginState,
    cwd: PathBuf,
    transfer_type: TransferType,
    data_channel: DataChannel,
}

impl SessionState {
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            login: LoginState::default(),
            cwd,
            transfer_type: TransferType::default(),
            data_channel: DataChannel::default(),
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn login(&self) -> &LoginState {
        &self.login
    }

    /// Absolute working directory of the session.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    pub fn transfer_mode(&self) -> TransferMode {
        self.data_channel.mode()
    }

    /// Port declared by the last PORT command, if in active mode.
    pub fn active_port(&self) -> Option<u16> {
        match self.data_channel {
            DataChannel::Active(port) => port,
            DataChannel::Passive(_) => None,
        }
    }

    // --------------------
    // Transitions
    // --------------------

    pub fn user(&mut self, username: &str) {
        self.login = LoginState::AwaitingPassword(username.to_string());
    }

    pub fn pass(&mut self) {
        let username = match &self.login {
            LoginState::AwaitingPassword(name) | LoginState::LoggedIn(name) => name.clone(),
            LoginState::Unauthenticated => "anonymous".to_string(),
        };
        self.login = LoginState::LoggedIn(username);
    }

    pub fn set_cwd(&mut self, cwd: PathBuf) {
        self.cwd = cwd;
    }

    pub fn set_transfer_type(&mut self, transfer_type: TransferType) {
        self.transfer_type = transfer_type;
    }

    /// Switches to active mode; drops any pending passive listener.
    pub fn enter_active(&mut self, port: u16) {
        self.data_channel = DataChannel::Active(Some(port));
    }

    /// Switches to passive mode with a freshly bound listener, replacing any
    /// earlier one.
    pub fn enter_passive(&mut self, listener: PassiveListener) {
        self.data_channel = DataChannel::Passive(Some(listener));
    }

    /// Takes what is needed to open the next data connection. A passive
    /// listener is handed out once; the mode stays passive.
    pub fn take_data_channel(&mut self) -> DataChannel {
        match &mut self.data_channel {
            DataChannel::Active(port) => DataChannel::Active(*port),
            DataChannel::Passive(listener) => DataChannel::Passive(listener.take()),
        }
    }
}
