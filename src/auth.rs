use std::collections::HashSet;

use async_trait::async_trait;
use pgwire::api::auth::{AuthSource, LoginInfo, Password};
use pgwire::error::PgWireResult;

use crate::model::Identity;

/// Single shared password, checked in cleartext during startup.
#[derive(Debug)]
pub struct RoomwardAuthSource {
    password: String,
}

impl RoomwardAuthSource {
    pub fn new(password: String) -> Self {
        Self { password }
    }
}

#[async_trait]
impl AuthSource for RoomwardAuthSource {
    async fn get_password(&self, _login: &LoginInfo) -> PgWireResult<Password> {
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}

/// Maps a connection's startup `user` to an actor. Reviewer standing is
/// granted by the server's configured reviewer set, never claimed by the
/// client.
pub fn identity_for(user: &str, reviewers: &HashSet<String>) -> Identity {
    Identity::new(user, reviewers.contains(user))
}
