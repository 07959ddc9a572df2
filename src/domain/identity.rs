use serde::{Deserialize, Serialize};

/// Identifier carried by the synthetic demo identity.
pub const GUEST_UID: &str = "demo-guest";

/// Distinguishes real accounts from the offline demo context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IdentityMode {
    Authenticated,
    Guest,
}

/// The signed-in (or demo) context that scopes all ledger data.
///
/// There is no "unauthenticated" identity value: the absence of an identity
/// is `Option::<Identity>::None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub mode: IdentityMode,
}

impl Identity {
    pub fn authenticated(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: Some(email.into()),
            mode: IdentityMode::Authenticated,
        }
    }

    pub fn guest() -> Self {
        Self {
            uid: GUEST_UID.into(),
            email: None,
            mode: IdentityMode::Guest,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.mode == IdentityMode::Guest
    }

    /// Name shown in a profile badge: the email's local part, or "Guest".
    pub fn display_name(&self) -> &str {
        match self.email.as_deref() {
            Some(email) => email.split('@').next().unwrap_or(email),
            None => "Guest",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_uses_email_local_part() {
        let identity = Identity::authenticated("u1", "mei.lin@example.com");
        assert_eq!(identity.display_name(), "mei.lin");
        assert_eq!(Identity::guest().display_name(), "Guest");
    }

    #[test]
    fn guest_has_no_email() {
        let guest = Identity::guest();
        assert!(guest.is_guest());
        assert_eq!(guest.uid, GUEST_UID);
        assert!(guest.email.is_none());
    }
}
