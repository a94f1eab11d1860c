use std::collections::BTreeSet;

/// Answers role-membership questions for the caller of one submit.
pub trait RoleOracle: Send + Sync {
    fn is_in_role(&self, role: &str) -> bool;
}

/// The identity a submit runs on behalf of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    id: Option<String>,
    roles: BTreeSet<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}

impl RoleOracle for Caller {
    fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
