//! Authenticated caller and what it may do

use super::service::{AuthError, Claims};
use crate::ledger::{Role, UserId};

/// Operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Own wallet, deposits, withdrawals and investments
    UseWallet,
    /// Approve, reject, force-edit and delete ledger rows
    ReconcileLedger,
    /// Roles and reference data
    ManageUsers,
    /// Trigger snapshot and accrual
    RunDistribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::UseWallet => true,
            Capability::ReconcileLedger | Capability::ManageUsers | Capability::RunDistribution => {
                self.role == Role::Admin
            }
        }
    }

    pub fn require(&self, capability: Capability) -> Result<(), AuthError> {
        if self.can(capability) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = self.user_id,
                capability = ?capability,
                "[AUTH] Capability denied"
            );
            Err(AuthError::Forbidden)
        }
    }
}

impl TryFrom<&Claims> for Principal {
    type Error = AuthError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(Principal::new(user_id, claims.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_cannot_reconcile() {
        let user = Principal::new(1, Role::User);
        assert!(user.can(Capability::UseWallet));
        assert!(matches!(
            user.require(Capability::ReconcileLedger),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn test_admin_has_every_capability() {
        let admin = Principal::new(1, Role::Admin);
        for cap in [
            Capability::UseWallet,
            Capability::ReconcileLedger,
            Capability::ManageUsers,
            Capability::RunDistribution,
        ] {
            assert!(admin.can(cap));
        }
    }

    #[test]
    fn test_claims_with_bad_subject() {
        let claims = Claims {
            sub: "abc".to_string(),
            role: Role::User,
            exp: 0,
            iat: 0,
        };
        assert!(Principal::try_from(&claims).is_err());
    }
}
