//! Brand-level access decisions
//!
//! These checks run before a telemetry request is issued, never on its result,
//! so a refused read reveals nothing about another brand's data.

use crate::error::AccessDenied;
use crate::session::{Role, Session};

/// Whether `session` may read data belonging to `target_brand`.
pub fn can_access_brand(session: &Session, target_brand: &str) -> bool {
    match session.role {
        Role::Admin => true,
        Role::Brand => session.brand == target_brand,
    }
}

/// Check a read for `target`, where `None` means every brand at once.
///
/// Only admins may issue unfiltered reads.
pub fn ensure_brand_access(session: &Session, target: Option<&str>) -> Result<(), AccessDenied> {
    let allowed = match target {
        Some(brand) => can_access_brand(session, brand),
        None => session.role == Role::Admin,
    };

    if allowed {
        Ok(())
    } else {
        Err(AccessDenied::new(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role, brand: &str) -> Session {
        Session {
            id: "1".into(),
            email: "someone@example.com".into(),
            brand: brand.into(),
            role,
        }
    }

    #[test]
    fn test_admin_sees_every_brand() {
        for own in ["all", "Platform Admin", "", "Coca-Cola"] {
            let admin = session(Role::Admin, own);
            for target in ["Coca-Cola", "Pepsi", "", "all"] {
                assert!(can_access_brand(&admin, target));
            }
            assert!(ensure_brand_access(&admin, None).is_ok());
        }
    }

    #[test]
    fn test_brand_sees_only_its_own_brand() {
        let owner = session(Role::Brand, "Coca-Cola");
        assert!(can_access_brand(&owner, "Coca-Cola"));
        assert!(!can_access_brand(&owner, "Pepsi"));
        assert!(!can_access_brand(&owner, "coca-cola"));
        assert!(!can_access_brand(&owner, "all"));
    }

    #[test]
    fn test_brand_cannot_read_all_brands() {
        let owner = session(Role::Brand, "Pepsi");
        assert_eq!(
            ensure_brand_access(&owner, None),
            Err(AccessDenied { brand: None })
        );
        assert_eq!(
            ensure_brand_access(&owner, Some("Coca-Cola")),
            Err(AccessDenied {
                brand: Some("Coca-Cola".into())
            })
        );
        assert!(ensure_brand_access(&owner, Some("Pepsi")).is_ok());
    }
}
