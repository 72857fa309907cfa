use serde::{Deserialize, Deserializer, Serialize};

use crate::storage::persisted::{Persisted, PersistedStore};

pub type SessionStore = PersistedStore<UserSession>;

/// Profile object returned by the backend on login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone: Option<String>,
}

/// Everything the login screen hands over. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInfo {
    pub username: Option<String>,
    pub password: Option<String>,
    pub remember: Option<bool>,
    pub token: Option<String>,
    pub user_info: Option<UserProfile>,
    #[serde(alias = "token_expire")]
    pub token_expire: Option<i64>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub userid: Option<String>,
    pub company: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub userphone: Option<String>,
}

/// Current user authentication and profile state.
///
/// The password is kept in plain text because the login screen pre-fills it
/// when `remember` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSession {
    pub username: String,
    pub password: String,
    pub remember: bool,
    pub token: String,
    #[serde(rename = "userInfo")]
    pub user_info: Option<UserProfile>,
    /// Epoch millis, 0 when unknown.
    pub token_expire: i64,
    pub name: String,
    pub userid: String,
    pub company: String,
    pub userphone: String,
}

impl UserSession {
    /// Replaces the whole session. Nothing from the previous login survives.
    pub fn set_login_info(&mut self, info: LoginInfo) {
        let profile = info.user_info.as_ref();

        let name = resolve_field(info.name.as_deref(), profile.and_then(|p| p.name.as_deref()));
        let userid = resolve_field(info.userid.as_deref(), profile.and_then(|p| p.id.as_deref()));
        let company = resolve_field(
            info.company.as_deref(),
            profile.and_then(|p| p.company.as_deref()),
        );
        let userphone = resolve_field(
            info.userphone.as_deref(),
            profile.and_then(|p| p.phone.as_deref()),
        );

        *self = Self {
            username: info.username.unwrap_or_default(),
            password: info.password.unwrap_or_default(),
            remember: info.remember.unwrap_or(false),
            token: info.token.unwrap_or_default(),
            user_info: info.user_info,
            token_expire: info.token_expire.unwrap_or(0),
            name,
            userid,
            company,
            userphone,
        };
    }

    pub fn clear_login_info(&mut self) {
        *self = Self::default();
    }

    pub fn token(&self) -> Option<&str> {
        Some(self.token.as_str()).filter(|t| !t.is_empty())
    }

    pub fn is_logged_out(&self) -> bool {
        *self == Self::default()
    }
}

impl Persisted for UserSession {
    const STORAGE_KEY: &'static str = "user";
    type Snapshot = UserSession;

    fn snapshot(&self) -> UserSession {
        self.clone()
    }

    fn restore(&mut self, snapshot: UserSession) {
        *self = snapshot;
    }
}

/// Precedence used for every derived profile field: the value given
/// directly, then the one from the profile object, then an empty string.
/// Empty strings count as missing at every step.
pub fn resolve_field(direct: Option<&str>, from_profile: Option<&str>) -> String {
    [direct, from_profile]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}
