use crate::core::{Capability, Principal};
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Maps chat-platform role ids onto capabilities.
///
/// Currently a single mapping: any role id in `admin_role_ids` grants
/// [`Capability::Admin`].
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    admin_role_ids: HashSet<String>,
}

impl RolePolicy {
    pub fn from_role_ids<I, S>(role_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admin_role_ids: role_ids
                .into_iter()
                .map(|id| id.as_ref().to_string())
                .collect(),
        }
    }

    pub fn grants_admin(&self, role_id: &str) -> bool {
        self.admin_role_ids.contains(role_id)
    }
}

/// Why an invocation was not authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The caller's capability set could not be determined.
    NoCapabilityInfo,
    /// The caller lacks one or more required capabilities.
    MissingCapabilities(BTreeSet<Capability>),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NoCapabilityInfo => {
                f.write_str("Cannot verify permissions: no capability information available")
            }
            DenialReason::MissingCapabilities(missing) => {
                let listing: Vec<String> =
                    missing.iter().map(|cap| cap.to_string()).collect();
                write!(f, "Missing required permissions: {}", listing.join(", "))
            }
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied(DenialReason),
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Authorization::Allowed)
    }
}

/// Decides whether a principal may execute a command.
///
/// Pure function of the principal and the current [`RolePolicy`] snapshot.
/// The policy is swappable at runtime; readers take an `Arc` snapshot per
/// call, so a swap is atomic and no caller ever observes a partial update.
pub struct PermissionGate {
    policy: RwLock<Arc<RolePolicy>>,
}

impl PermissionGate {
    pub fn new(policy: RolePolicy) -> Self {
        Self {
            policy: RwLock::new(Arc::new(policy)),
        }
    }

    /// Replaces the role policy. Calls already in flight keep the snapshot
    /// they started with; every later call sees the new policy.
    pub fn update_policy(&self, policy: RolePolicy) {
        let mut current = match self.policy.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = Arc::new(policy);
        info!("updated role policy");
    }

    fn current_policy(&self) -> Arc<RolePolicy> {
        match self.policy.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Allowed iff every required capability is held (declared capabilities
    /// plus any granted by the role policy). Denied otherwise, carrying the
    /// exact missing set, or `NoCapabilityInfo` when the principal's
    /// capabilities were unresolvable.
    pub fn authorize(
        &self,
        principal: &Principal,
        required: &BTreeSet<Capability>,
    ) -> Authorization {
        if required.is_empty() {
            return Authorization::Allowed;
        }

        let Some(declared) = &principal.capabilities else {
            warn!(
                "cannot verify permissions: user={} has no capability info",
                principal.user_id
            );
            return Authorization::Denied(DenialReason::NoCapabilityInfo);
        };

        let policy = self.current_policy();
        let mut effective = declared.clone();
        if principal
            .role_ids
            .iter()
            .any(|role_id| policy.grants_admin(role_id))
        {
            effective.insert(Capability::Admin);
        }

        let missing: BTreeSet<Capability> =
            required.difference(&effective).copied().collect();

        if missing.is_empty() {
            debug!("authorization passed: user={}", principal.user_id);
            Authorization::Allowed
        } else {
            warn!(
                "authorization denied: user={} missing={:?}",
                principal.user_id, missing
            );
            Authorization::Denied(DenialReason::MissingCapabilities(missing))
        }
    }
}
