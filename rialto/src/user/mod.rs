//! The user directory is the in-memory user set behind the auth routes. Passwords
//! are held in clear because this is demo seed data, a production deployment would
//! externalize the table and hash credentials.
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Free,
    Weekly,
    Monthly,
    Admin,
}

impl Tier {
    /// Market data is gated to paying tiers. FREE users receive a
    /// subscription-required signal instead of quotes.
    pub fn can_view_market(&self) -> bool {
        matches!(self, Tier::Weekly | Tier::Monthly | Tier::Admin)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub avatar: String,
    pub is_admin: bool,
    pub tier: Tier,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<String>,
}

impl UserProfile {
    /// A FREE user with no subscription attached still has to pick a plan.
    pub fn needs_subscription(&self) -> bool {
        self.tier == Tier::Free
            && self.subscription_id.is_none()
            && self.subscription_status.is_none()
    }
}

/// Lightweight projection returned by the active-users listing.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ActiveUser {
    pub id: String,
    pub username: String,
    pub avatar: String,
    pub tier: Tier,
}

#[derive(Clone, Debug)]
struct UserRecord {
    profile: UserProfile,
    password: String,
}

#[derive(Clone, Debug, Default)]
pub struct UserDirectory {
    users: Vec<UserRecord>,
    last_id: u64,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            users: Vec::new(),
            last_id: 0,
        }
    }

    /// Seed users matching the demo deployment: an admin and a FREE-tier user.
    pub fn demo() -> Self {
        let mut directory = Self::new();
        directory.insert(
            UserProfile {
                id: "1".to_string(),
                username: "admin".to_string(),
                avatar: "https://i.pravatar.cc/80?img=1".to_string(),
                is_admin: true,
                tier: Tier::Admin,
                subscription_id: None,
                subscription_status: None,
            },
            "adminpass",
        );
        directory.insert(
            UserProfile {
                id: "2".to_string(),
                username: "testuser".to_string(),
                avatar: "https://i.pravatar.cc/80?img=2".to_string(),
                is_admin: false,
                tier: Tier::Free,
                subscription_id: None,
                subscription_status: None,
            },
            "1234",
        );
        directory.last_id = 2;
        directory
    }

    fn insert(&mut self, profile: UserProfile, password: &str) {
        self.users.push(UserRecord {
            profile,
            password: password.to_string(),
        });
    }

    fn next_id(&mut self) -> String {
        let now_millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;
        let id = now_millis.max(self.last_id + 1);
        self.last_id = id;
        id.to_string()
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Option<&UserProfile> {
        self.users
            .iter()
            .find(|record| record.profile.username == username && record.password == password)
            .map(|record| &record.profile)
    }

    /// Creates a FREE-tier non-admin user. Returns `None` when the username is
    /// already taken. The caller validates field presence.
    pub fn register(&mut self, username: &str, password: &str) -> Option<UserProfile> {
        if self
            .users
            .iter()
            .any(|record| record.profile.username == username)
        {
            return None;
        }

        let profile = UserProfile {
            id: self.next_id(),
            username: username.to_string(),
            avatar: format!("https://i.pravatar.cc/80?u={username}"),
            is_admin: false,
            tier: Tier::Free,
            subscription_id: None,
            subscription_status: None,
        };
        self.insert(profile.clone(), password);
        Some(profile)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&UserProfile> {
        self.users
            .iter()
            .find(|record| record.profile.id == id)
            .map(|record| &record.profile)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&UserProfile> {
        self.users
            .iter()
            .find(|record| record.profile.username == username)
            .map(|record| &record.profile)
    }

    pub fn active(&self) -> Vec<ActiveUser> {
        self.users
            .iter()
            .map(|record| ActiveUser {
                id: record.profile.id.clone(),
                username: record.profile.username.clone(),
                avatar: record.profile.avatar.clone(),
                tier: record.profile.tier,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Tier, UserDirectory};

    #[test]
    fn test_that_demo_credentials_authenticate() {
        let directory = UserDirectory::demo();

        let admin = directory.authenticate("admin", "adminpass").unwrap();
        assert!(admin.is_admin);
        assert_eq!(admin.tier, Tier::Admin);

        assert!(directory.authenticate("admin", "wrongpass").is_none());
        assert!(directory.authenticate("nobody", "adminpass").is_none());
    }

    #[test]
    fn test_that_register_rejects_duplicate_username() {
        let mut directory = UserDirectory::demo();

        let user = directory.register("newtrader", "hunter2").unwrap();
        assert!(!user.is_admin);
        assert_eq!(user.tier, Tier::Free);
        assert!(directory.register("newtrader", "other").is_none());
        // Seeded usernames are taken too
        assert!(directory.register("admin", "other").is_none());
    }

    #[test]
    fn test_that_free_user_without_subscription_needs_one() {
        let mut directory = UserDirectory::demo();
        let user = directory.register("newtrader", "hunter2").unwrap();
        assert!(user.needs_subscription());

        let admin = directory.find_by_username("admin").unwrap();
        assert!(!admin.needs_subscription());
    }

    #[test]
    fn test_that_active_projection_carries_no_credentials() {
        let directory = UserDirectory::demo();
        let active = directory.active();
        assert_eq!(active.len(), 2);

        let value = serde_json::to_value(&active).unwrap();
        assert_eq!(value[0]["username"], "admin");
        assert!(value[0].get("password").is_none());
        assert!(value[0].get("isAdmin").is_none());
    }

    #[test]
    fn test_that_market_gate_tracks_tier() {
        assert!(!Tier::Free.can_view_market());
        assert!(Tier::Weekly.can_view_market());
        assert!(Tier::Monthly.can_view_market());
        assert!(Tier::Admin.can_view_market());
    }
}
