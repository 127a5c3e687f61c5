//! Access checks combining resolved privileges with a resource ACL.

use super::{AccessControlList, Action, PrivilegeError, Privileges};
use crate::db::User;

/// Check whether `user` may perform `action` on a resource.
///
/// `resolved` must already account for any override on the resource. An
/// empty ACL leaves the decision to privileges alone; a non-empty one also
/// restricts access to the owner, listed members and administrators.
pub fn authorize(
    user: &User,
    resolved: &Privileges,
    acl: &AccessControlList,
    owner_id: &str,
    action: Action,
) -> Result<(), PrivilegeError> {
    if !resolved.allows(action) {
        return Err(PrivilegeError::Forbidden(format!(
            "user {} lacks {action} privilege",
            user.username
        )));
    }

    if acl.is_empty() || user.id == owner_id || resolved.add_users || acl.has_user(user) {
        return Ok(());
    }

    Err(PrivilegeError::Forbidden(format!(
        "user {} is not in the access list",
        user.username
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Role;

    fn user(name: &str, role: Role) -> User {
        User::new(name, "hash", "", role)
    }

    #[test]
    fn test_role_privileges_gate_action() {
        let regular = user("reader", Role::Regular);
        let resolved = Privileges::for_role(Role::Regular);
        let acl = AccessControlList::new();

        assert!(authorize(&regular, &resolved, &acl, "someone", Action::Read).is_ok());
        assert!(authorize(&regular, &resolved, &acl, "someone", Action::Write).is_err());
        assert!(authorize(&regular, &resolved, &acl, &regular.id, Action::Delete).is_err());
    }

    #[test]
    fn test_acl_restricts_members() {
        let member = user("member", Role::Regular);
        let outsider = user("outsider", Role::Regular);
        let owner = user("owner", Role::Owner);
        let mut acl = AccessControlList::new();
        acl.add_user(member.clone()).unwrap();
        let regular = Privileges::for_role(Role::Regular);

        assert!(authorize(&member, &regular, &acl, &owner.id, Action::Read).is_ok());
        assert!(authorize(&outsider, &regular, &acl, &owner.id, Action::Read).is_err());
        assert!(authorize(
            &owner,
            &Privileges::for_role(Role::Owner),
            &acl,
            &owner.id,
            Action::Delete
        )
        .is_ok());
    }

    #[test]
    fn test_admin_bypasses_acl() {
        let admin = user("admin", Role::Admin);
        let mut acl = AccessControlList::new();
        acl.add_user(user("member", Role::Regular)).unwrap();

        assert!(authorize(&admin, &Privileges::FULL, &acl, "owner", Action::Delete).is_ok());
    }
}
