pub mod admin;
pub mod error;
pub mod memory;
pub mod model;
pub mod permission;
pub mod registry;
pub mod resolver;
pub mod store;

pub use admin::RbacAdmin;
pub use error::{AdminError, ResolveError, StoreError, ValidationError};
pub use memory::{InMemoryPermissionStore, InMemoryRoleStore, InMemoryUserStore};
pub use model::{Role, RoleWithPermissions, User, UserWithRoles};
pub use permission::{Permission, Permissions, Scope, MAX_PERMISSIONS};
pub use registry::{Registry, Repositories, Restore};
pub use resolver::RoleResolver;
pub use store::{PermissionStore, RoleStore, StoreResult, UserStore};
