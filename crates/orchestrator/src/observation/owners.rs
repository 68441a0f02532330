#![forbid(unsafe_code)]

use nix::unistd::{Uid, User};
use tracing::debug;

pub trait OwnerResolver: Send + Sync {
    /// Resolve a numeric account id to its name, if the account still exists.
    fn resolve(&self, uid: u32) -> Option<String>;
}

/// Resolves names through the system account database.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOwners;

impl OwnerResolver for SystemOwners {
    fn resolve(&self, uid: u32) -> Option<String> {
        match User::from_uid(Uid::from_raw(uid)) {
            Ok(Some(user)) => Some(user.name),
            Ok(None) => None,
            Err(err) => {
                debug!(uid, %err, "account lookup failed");
                None
            }
        }
    }
}
