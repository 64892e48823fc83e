//! Privilege checkers for exercising the planner's authorization hook.

use std::sync::Mutex;

use planner::{Privilege, PrivilegeChecker};

/// One call the planner made into the privilege subsystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivilegeRequest {
    pub roles: Vec<String>,
    pub db: String,
    pub table: String,
    pub privilege: Privilege,
}

/// Grants everything except an explicit deny list and records every request.
///
/// # Example
///
/// ```
/// use planner::Privilege;
/// use testsupport::prelude::*;
///
/// let checker = RecordingPrivileges::allow_all().deny("t", Privilege::Update);
/// assert!(checker.requests().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingPrivileges {
    denied: Vec<(String, Privilege)>,
    requests: Mutex<Vec<PrivilegeRequest>>,
}

impl RecordingPrivileges {
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Refuse `privilege` on every table named `table`, in any database.
    pub fn deny(mut self, table: &str, privilege: Privilege) -> Self {
        self.denied.push((table.to_lowercase(), privilege));
        self
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<PrivilegeRequest> {
        self.requests
            .lock()
            .expect("privilege log poisoned")
            .clone()
    }

    /// Just the privileges requested, in order.
    pub fn requested_privileges(&self) -> Vec<Privilege> {
        self.requests().into_iter().map(|r| r.privilege).collect()
    }
}

impl PrivilegeChecker for RecordingPrivileges {
    fn request_verification(
        &self,
        roles: &[String],
        db: &str,
        table: &str,
        privilege: Privilege,
    ) -> bool {
        self.requests
            .lock()
            .expect("privilege log poisoned")
            .push(PrivilegeRequest {
                roles: roles.to_vec(),
                db: db.to_string(),
                table: table.to_string(),
                privilege,
            });
        !self
            .denied
            .iter()
            .any(|(t, p)| *p == privilege && t.eq_ignore_ascii_case(table))
    }
}

/// Refuses every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenyAll;

impl PrivilegeChecker for DenyAll {
    fn request_verification(&self, _: &[String], _: &str, _: &str, _: Privilege) -> bool {
        false
    }
}
