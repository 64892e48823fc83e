use std::fmt;

use catalog::Catalog;

/// Read-only snapshot of the session and transaction state the fast path
/// consults. Planning never mutates it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    pub current_db: String,
    pub autocommit: bool,
    /// An explicit transaction (`BEGIN`/`START TRANSACTION`) is open.
    pub in_txn: bool,
    /// The open transaction uses pessimistic locking.
    pub pessimistic: bool,
    pub active_roles: Vec<String>,
}

#[bon::bon]
impl SessionContext {
    /// Create a session snapshot using a builder pattern.
    ///
    /// # Example
    /// ```ignore
    /// let session = SessionContext::builder()
    ///     .current_db("test")
    ///     .in_txn(true)
    ///     .pessimistic(true)
    ///     .build();
    /// ```
    #[builder]
    pub fn new(
        #[builder(into)] current_db: String,
        #[builder(default = true)] autocommit: bool,
        #[builder(default)] in_txn: bool,
        #[builder(default)] pessimistic: bool,
        #[builder(default)] active_roles: Vec<String>,
    ) -> Self {
        Self {
            current_db,
            autocommit,
            in_txn,
            pessimistic,
            active_roles,
        }
    }

    /// `SELECT ... FOR UPDATE` only locks rows when autocommit is off or an
    /// explicit transaction is open.
    pub fn locks_for_update(&self) -> bool {
        !self.autocommit || self.in_txn
    }
}

/// Privilege kinds requested by the fast path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Privilege {
    Select,
    Update,
    Delete,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Privilege::Select => "SELECT",
            Privilege::Update => "UPDATE",
            Privilege::Delete => "DELETE",
        })
    }
}

/// Privilege subsystem as seen by the planner.
pub trait PrivilegeChecker: Send + Sync {
    /// Returns true when `roles` may exercise `privilege` on `db.table`.
    fn request_verification(
        &self,
        roles: &[String],
        db: &str,
        table: &str,
        privilege: Privilege,
    ) -> bool;
}

/// Everything a planning attempt reads: catalog snapshot, session state and
/// the optional privilege checker.
#[derive(Clone, Copy)]
pub struct PlanContext<'a> {
    pub catalog: &'a Catalog,
    pub session: &'a SessionContext,
    pub privileges: Option<&'a dyn PrivilegeChecker>,
}

impl<'a> PlanContext<'a> {
    pub fn new(catalog: &'a Catalog, session: &'a SessionContext) -> Self {
        Self {
            catalog,
            session,
            privileges: None,
        }
    }

    pub fn with_privileges(mut self, checker: &'a dyn PrivilegeChecker) -> Self {
        self.privileges = Some(checker);
        self
    }

    /// Verify every privilege in `required`. No checker means everything is granted.
    pub(crate) fn check_privileges(&self, db: &str, table: &str, required: &[Privilege]) -> bool {
        let Some(checker) = self.privileges else {
            return true;
        };
        required.iter().all(|&privilege| {
            checker.request_verification(&self.session.active_roles, db, table, privilege)
        })
    }
}

impl fmt::Debug for PlanContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanContext")
            .field("session", self.session)
            .field("privileges", &self.privileges.is_some())
            .finish_non_exhaustive()
    }
}
