//! Who may read, edit or administer a list

use crate::error::{Error, Result};
use crate::model::TaskList;

/// Level of access an operation needs on a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    /// Rename, visibility, membership and deletion
    Own,
}

pub fn is_owner(list: &TaskList, user_id: &str) -> bool {
    list.owner == user_id
}

pub fn has_read_permission(list: &TaskList, user_id: &str) -> bool {
    !list.private || has_write_permission(list, user_id)
}

pub fn has_write_permission(list: &TaskList, user_id: &str) -> bool {
    is_owner(list, user_id) || list.members.contains(user_id)
}

pub fn allows(list: &TaskList, user_id: &str, access: Access) -> bool {
    match access {
        Access::Read => has_read_permission(list, user_id),
        Access::Write => has_write_permission(list, user_id),
        Access::Own => is_owner(list, user_id),
    }
}

/// `AccessDenied` unless `user_id` has `access` on `list`
pub fn authorize(list: &TaskList, user_id: &str, access: Access) -> Result<()> {
    if allows(list, user_id, access) {
        return Ok(());
    }
    let action = match access {
        Access::Read => "read",
        Access::Write => "modify",
        Access::Own => "administer",
    };
    Err(Error::AccessDenied(format!(
        "user {user_id} may not {action} list {}",
        list.id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(private: bool) -> TaskList {
        let mut list = TaskList::new("groceries", "owner", private);
        list.members.insert("member".to_string());
        list
    }

    #[test]
    fn public_lists_are_readable_by_anyone() {
        let list = list(false);
        assert!(has_read_permission(&list, "stranger"));
        assert!(!has_write_permission(&list, "stranger"));
    }

    #[test]
    fn private_lists_need_membership() {
        let list = list(true);
        assert!(!has_read_permission(&list, "stranger"));
        assert!(has_read_permission(&list, "member"));
        assert!(has_write_permission(&list, "member"));
        assert!(has_read_permission(&list, "owner"));
    }

    #[test]
    fn only_the_owner_administers() {
        let list = list(false);
        authorize(&list, "owner", Access::Own).unwrap();
        let err = authorize(&list, "member", Access::Own).unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));
    }
}
