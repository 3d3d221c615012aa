use crate::identity::UserIdentity;

/// Per-user goose session data: a registered account with a step-counting
/// device.
#[derive(Debug)]
pub struct UserSession {
    identity: UserIdentity,
    device_sync: u64,
    auth_token: String,
}

impl UserSession {
    /// `auth_token` is the raw token response body, usable or not.
    pub fn new(identity: UserIdentity, auth_token: String) -> Self {
        Self {
            identity,
            device_sync: 0,
            auth_token,
        }
    }

    /// Counter sent with each steps update, starting at 1.
    pub fn next_device_sync(&mut self) -> u64 {
        self.device_sync += 1;
        self.device_sync
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn device_sync(&self) -> u64 {
        self.device_sync
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }
}
