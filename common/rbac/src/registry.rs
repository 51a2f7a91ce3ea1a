use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::memory::{InMemoryPermissionStore, InMemoryRoleStore, InMemoryUserStore};
use crate::store::{PermissionStore, RoleStore, UserStore};

/// Holder for the active implementation of a store.
///
/// Readers clone the current `Arc` under a read lock, so a swap is never
/// observed half way and no lock is held while the store is in use.
pub struct Registry<T: ?Sized> {
    slot: Arc<RwLock<Arc<T>>>,
}

impl<T: ?Sized> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn new(initial: Arc<T>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn current(&self) -> Arc<T> {
        let guard = self.slot.read().expect("rwlock poisoned");
        Arc::clone(&*guard)
    }

    /// Install `next` and hand back a guard able to put the old instance back.
    pub fn replace(&self, next: Arc<T>) -> Restore<T> {
        let mut guard = self.slot.write().expect("rwlock poisoned");
        let previous = std::mem::replace(&mut *guard, next);
        Restore {
            slot: Arc::clone(&self.slot),
            previous,
        }
    }
}

/// Returned by [`Registry::replace`]. Dropping it keeps the replacement in place.
#[must_use = "call restore() to reinstate the previous store"]
pub struct Restore<T: ?Sized> {
    slot: Arc<RwLock<Arc<T>>>,
    previous: Arc<T>,
}

impl<T: ?Sized> Restore<T> {
    pub fn previous(&self) -> &Arc<T> {
        &self.previous
    }

    pub fn restore(self) {
        let mut guard = self.slot.write().expect("rwlock poisoned");
        *guard = self.previous;
    }
}

/// The three store registries the auth core reads from.
#[derive(Clone)]
pub struct Repositories {
    pub users: Registry<dyn UserStore>,
    pub roles: Registry<dyn RoleStore>,
    pub permissions: Registry<dyn PermissionStore>,
}

static GLOBAL: Lazy<Repositories> = Lazy::new(Repositories::in_memory);

impl Repositories {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        permissions: Arc<dyn PermissionStore>,
    ) -> Self {
        Self {
            users: Registry::new(users),
            roles: Registry::new(roles),
            permissions: Registry::new(permissions),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryRoleStore::new()),
            Arc::new(InMemoryPermissionStore::new()),
        )
    }

    /// Process-wide instance, starting out with empty in-memory stores.
    ///
    /// Prefer passing a `Repositories` value through constructors; this exists
    /// so tests and tools can swap backends without threading one through.
    pub fn global() -> &'static Repositories {
        &GLOBAL
    }

    pub fn users(&self) -> Arc<dyn UserStore> {
        self.users.current()
    }

    pub fn roles(&self) -> Arc<dyn RoleStore> {
        self.roles.current()
    }

    pub fn permissions(&self) -> Arc<dyn PermissionStore> {
        self.permissions.current()
    }
}
