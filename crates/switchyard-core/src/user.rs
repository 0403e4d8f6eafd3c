// SPDX-License-Identifier: Apache-2.0
//! Users: model, account commands, and their rollback inverses.

use switchyard_store::codec::{ByteReader, ByteWriter, CodecError, Record};
use switchyard_store::{Managed, RecordId, StoreError};

use crate::command::{AddUser, Login, Logout, ModifyProfile, QueryProfile};
use crate::error::CommandError;
use crate::response::{Profile, Response};
use crate::rollback::InverseOp;
use crate::system::System;
use crate::{DisplayName, Email, Password, Username, MAX_PRIVILEGE};

/// A registered account.
#[derive(Debug, Clone, Copy, Default)]
pub struct User {
    pub username: Username,
    pub password: Password,
    pub name: DisplayName,
    pub email: Email,
    pub privilege: i32,
}

impl Record for User {
    const BYTES: usize = Username::BYTES + Password::BYTES + DisplayName::BYTES + Email::BYTES + 4;

    fn store(&self, out: &mut ByteWriter<'_>) {
        self.username.store(out);
        self.password.store(out);
        self.name.store(out);
        self.email.store(out);
        out.put_i32(self.privilege);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            username: Username::load(input)?,
            password: Password::load(input)?,
            name: DisplayName::load(input)?,
            email: Email::load(input)?,
            privilege: input.i32()?,
        })
    }
}

impl User {
    fn profile(&self) -> Profile {
        Profile {
            username: self.username.to_string(),
            name: self.name.to_string(),
            email: self.email.to_string(),
            privilege: self.privilege,
        }
    }
}

pub(crate) fn valid_username(text: &str) -> bool {
    let raw = text.as_bytes();
    (1..=Username::BYTES).contains(&raw.len())
        && raw[0].is_ascii_alphabetic()
        && raw.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
}

fn valid_password(text: &str) -> bool {
    let raw = text.as_bytes();
    (1..=Password::BYTES).contains(&raw.len()) && raw.iter().all(|b| (0x21..=0x7E).contains(b))
}

fn valid_name(text: &str) -> bool {
    (1..=DisplayName::BYTES).contains(&text.len())
}

fn valid_email(text: &str) -> bool {
    (1..=Email::BYTES).contains(&text.len())
}

fn valid_privilege(privilege: i32) -> bool {
    (0..=MAX_PRIVILEGE).contains(&privilege)
}

impl System {
    /// Load the user carrying exactly `name`.
    ///
    /// The username index is hash-keyed, so every bucket candidate is
    /// re-checked against the actual name.
    pub(crate) fn find_user(
        &mut self,
        name: &Username,
    ) -> Result<Option<Managed<User>>, StoreError> {
        for id in self.ix_username.find_many(name)? {
            let user = self.users.get(id)?;
            if user.username == *name {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    pub(crate) fn run_add_user(&mut self, cmd: &AddUser) -> Result<Response, CommandError> {
        if !valid_username(&cmd.username)
            || !valid_password(&cmd.password)
            || !valid_name(&cmd.name)
            || !valid_email(&cmd.email)
            || !cmd.privilege.is_none_or(valid_privilege)
        {
            return Err(CommandError::InvalidField("user field"));
        }
        let username = Username::new(&cmd.username)?;

        let bootstrap = self.ix_username.is_empty()?;
        let privilege = if bootstrap {
            // The very first account is the operator and gets everything.
            MAX_PRIVILEGE
        } else {
            let (Some(current), Some(granted)) = (&cmd.current_user, cmd.privilege) else {
                return Err(CommandError::PermissionDenied);
            };
            let current = Username::new(current).map_err(|_| CommandError::NotLoggedIn)?;
            let acting = self
                .sessions
                .privilege_of(&current)
                .ok_or(CommandError::NotLoggedIn)?;
            if acting <= granted {
                return Err(CommandError::PermissionDenied);
            }
            if self.find_user(&username)?.is_some() {
                return Err(CommandError::Duplicate("username"));
            }
            granted
        };

        let mut user = Managed::fresh(User {
            username,
            password: Password::new(&cmd.password)?,
            name: DisplayName::new(&cmd.name)?,
            email: Email::new(&cmd.email)?,
            privilege,
        });
        let id = user.save(&mut self.users)?;
        self.ix_username.insert(&username, id)?;
        self.log_entry(InverseOp::AddUser { id })?;
        Ok(Response::Unit)
    }

    pub(crate) fn run_login(&mut self, cmd: &Login) -> Result<Response, CommandError> {
        let username =
            Username::new(&cmd.username).map_err(|_| CommandError::BadCredentials)?;
        if self.sessions.is_logged_in(&username) {
            return Err(CommandError::AlreadyLoggedIn);
        }
        let user = self
            .find_user(&username)?
            .ok_or(CommandError::BadCredentials)?;
        if user.password.as_str() != cmd.password {
            return Err(CommandError::BadCredentials);
        }
        self.sessions.login(username, user.privilege);
        Ok(Response::Unit)
    }

    pub(crate) fn run_logout(&mut self, cmd: &Logout) -> Result<Response, CommandError> {
        let username = Username::new(&cmd.username).map_err(|_| CommandError::NotLoggedIn)?;
        if self.sessions.logout(&username) {
            Ok(Response::Unit)
        } else {
            Err(CommandError::NotLoggedIn)
        }
    }

    pub(crate) fn run_query_profile(
        &mut self,
        cmd: &QueryProfile,
    ) -> Result<Response, CommandError> {
        let current = Username::new(&cmd.current_user).map_err(|_| CommandError::NotLoggedIn)?;
        let acting = self
            .sessions
            .privilege_of(&current)
            .ok_or(CommandError::NotLoggedIn)?;
        let username =
            Username::new(&cmd.username).map_err(|_| CommandError::NotFound("user"))?;
        let target = self
            .find_user(&username)?
            .ok_or(CommandError::NotFound("user"))?;
        if current != username && acting <= target.privilege {
            return Err(CommandError::PermissionDenied);
        }
        Ok(Response::Profile(target.profile()))
    }

    pub(crate) fn run_modify_profile(
        &mut self,
        cmd: &ModifyProfile,
    ) -> Result<Response, CommandError> {
        if !cmd.password.as_deref().is_none_or(valid_password)
            || !cmd.name.as_deref().is_none_or(valid_name)
            || !cmd.email.as_deref().is_none_or(valid_email)
            || !cmd.privilege.is_none_or(valid_privilege)
        {
            return Err(CommandError::InvalidField("user field"));
        }
        let current = Username::new(&cmd.current_user).map_err(|_| CommandError::NotLoggedIn)?;
        let acting = self
            .sessions
            .privilege_of(&current)
            .ok_or(CommandError::NotLoggedIn)?;
        let username =
            Username::new(&cmd.username).map_err(|_| CommandError::NotFound("user"))?;
        let mut target = self
            .find_user(&username)?
            .ok_or(CommandError::NotFound("user"))?;
        if current != username && acting <= target.privilege {
            return Err(CommandError::PermissionDenied);
        }
        if cmd.privilege.is_some_and(|granted| acting <= granted) {
            return Err(CommandError::PermissionDenied);
        }

        // Record the previous value of exactly the fields we overwrite.
        let mut prev_password = None;
        let mut prev_name = None;
        let mut prev_email = None;
        let mut prev_privilege = None;
        if let Some(password) = &cmd.password {
            prev_password = Some(target.password);
            target.password = Password::new(password)?;
        }
        if let Some(name) = &cmd.name {
            prev_name = Some(target.name);
            target.name = DisplayName::new(name)?;
        }
        if let Some(email) = &cmd.email {
            prev_email = Some(target.email);
            target.email = Email::new(email)?;
        }
        if let Some(privilege) = cmd.privilege {
            prev_privilege = Some(target.privilege);
            target.privilege = privilege;
            self.sessions.refresh_privilege(&username, privilege);
        }
        target.update(&mut self.users)?;
        self.log_entry(InverseOp::ModifyProfile {
            id: target.saved_id()?,
            password: prev_password,
            name: prev_name,
            email: prev_email,
            privilege: prev_privilege,
        })?;
        Ok(Response::Profile(target.profile()))
    }

    pub(crate) fn undo_add_user(&mut self, id: RecordId) -> Result<(), StoreError> {
        let mut user = self.users.get(id)?;
        let username = user.username;
        self.ix_username.remove(&username, id)?;
        user.destroy(&mut self.users)
    }

    #[allow(clippy::similar_names)]
    pub(crate) fn undo_modify_profile(
        &mut self,
        id: RecordId,
        password: Option<Password>,
        name: Option<DisplayName>,
        email: Option<Email>,
        privilege: Option<i32>,
    ) -> Result<(), StoreError> {
        let mut user = self.users.get(id)?;
        if let Some(password) = password {
            user.password = password;
        }
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(privilege) = privilege {
            user.privilege = privilege;
        }
        user.update(&mut self.users)
    }
}
