/// The caller on whose behalf an operation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// Empty identifiers are treated as anonymous.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|uid| !uid.is_empty())
    }
}
