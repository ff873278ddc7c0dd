//! Accounts issuing administrative mutations.
//!
//! Identity, credentials and role transitions belong to another service; the
//! gateway only needs enough of an account to decide what it may change.

use serde::{Deserialize, Serialize};

use super::device::AccountId;

/// Role discriminant of an [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountRole {
    User,
    Admin,
    Root,
}

/// Account acting on the fleet.
///
/// Admin accounts only gain their capabilities once a root account has
/// accepted them.
///
/// # Examples
/// ```
/// use tracker_backend::domain::{Account, AccountId};
///
/// let root = Account::Root { id: AccountId::random() };
/// assert!(root.can_assign_owners());
///
/// let pending = Account::Admin { id: AccountId::random(), accepted: false };
/// assert!(!pending.can_manage_devices());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account {
    User { id: AccountId },
    Admin { id: AccountId, accepted: bool },
    Root { id: AccountId },
}

impl Account {
    pub fn id(&self) -> AccountId {
        match self {
            Self::User { id } | Self::Admin { id, .. } | Self::Root { id } => *id,
        }
    }

    pub fn role(&self) -> AccountRole {
        match self {
            Self::User { .. } => AccountRole::User,
            Self::Admin { .. } => AccountRole::Admin,
            Self::Root { .. } => AccountRole::Root,
        }
    }

    /// Whether the account may queue commands and push configurations.
    pub fn can_manage_devices(&self) -> bool {
        match self {
            Self::User { .. } => false,
            Self::Admin { accepted, .. } => *accepted,
            Self::Root { .. } => true,
        }
    }

    /// Whether the account may assign device owners.
    pub fn can_assign_owners(&self) -> bool {
        match self {
            Self::User { .. } | Self::Admin { .. } => false,
            Self::Root { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Account::User { id: AccountId::random() }, false, false)]
    #[case(Account::Admin { id: AccountId::random(), accepted: false }, false, false)]
    #[case(Account::Admin { id: AccountId::random(), accepted: true }, true, false)]
    #[case(Account::Root { id: AccountId::random() }, true, true)]
    fn capabilities_follow_role(
        #[case] account: Account,
        #[case] manage: bool,
        #[case] assign: bool,
    ) {
        assert_eq!(account.can_manage_devices(), manage);
        assert_eq!(account.can_assign_owners(), assign);
    }

    #[rstest]
    fn role_matches_variant() {
        let id = AccountId::random();
        assert_eq!(Account::Root { id }.role(), AccountRole::Root);
        assert_eq!(Account::Root { id }.id(), id);
    }
}
