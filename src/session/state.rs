use serde::{Deserialize, Serialize};

use crate::models::User;
use crate::store::Reducer;

/// Who is logged in.
///
/// `user` and `token` are both set by `Login` and both cleared by `Logout`.
/// `SetUser`/`SetToken` change one field at a time and can leave only one of
/// them present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

/// Transitions of the session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Replace the user; authentication follows the presence of the user
    SetUser(Option<User>),
    /// Replace the token only
    SetToken(Option<String>),
    Login { user: User, token: String },
    Logout,
}

impl Reducer for Session {
    type Action = SessionAction;

    fn reduce(&self, action: SessionAction) -> Self {
        match action {
            SessionAction::SetUser(user) => Session {
                is_authenticated: user.is_some(),
                user,
                token: self.token.clone(),
            },
            SessionAction::SetToken(token) => Session {
                token,
                ..self.clone()
            },
            SessionAction::Login { user, token } => Session {
                user: Some(user),
                token: Some(token),
                is_authenticated: true,
            },
            SessionAction::Logout => Session::default(),
        }
    }
}

impl Session {
    /// Name of the current user, if any
    pub fn display_name(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.name.as_str())
    }

    /// `true` when user and token are both present or both absent
    pub fn is_consistent(&self) -> bool {
        self.user.is_some() == self.token.is_some()
    }
}
