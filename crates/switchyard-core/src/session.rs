// SPDX-License-Identifier: Apache-2.0
//! In-memory session table.

use rustc_hash::FxHashMap;

use crate::Username;

/// Logged-in users and their cached privilege.
///
/// Purely in-memory: sessions do not survive the process, and both
/// `rollback` and `clean` flush the table wholesale. The cached privilege
/// is refreshed when `modify_profile` changes a logged-in user's level.
#[derive(Debug, Default)]
pub struct SessionTable {
    active: FxHashMap<Username, i32>,
}

impl SessionTable {
    /// True when `user` has an open session.
    #[must_use]
    pub fn is_logged_in(&self, user: &Username) -> bool {
        self.active.contains_key(user)
    }

    /// Cached privilege of a logged-in user.
    #[must_use]
    pub fn privilege_of(&self, user: &Username) -> Option<i32> {
        self.active.get(user).copied()
    }

    /// Open a session.
    pub fn login(&mut self, user: Username, privilege: i32) {
        self.active.insert(user, privilege);
    }

    /// Close a session; reports whether one was open.
    pub fn logout(&mut self, user: &Username) -> bool {
        self.active.remove(user).is_some()
    }

    /// Refresh the cached privilege when the user is logged in.
    pub fn refresh_privilege(&mut self, user: &Username, privilege: i32) {
        if let Some(cached) = self.active.get_mut(user) {
            *cached = privilege;
        }
    }

    /// Close every session.
    pub fn clear(&mut self) {
        self.active.clear();
    }
}
