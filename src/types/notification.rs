use serde::{Deserialize, Serialize};

pub const DEFAULT_ICON: &str = "/static/icons/icon-192.png";
pub const DEFAULT_IMAGE: &str = "/static/icons/icon-512.png";

/// A notification as requested by a caller. Icon and image are optional here;
/// they are filled in by [`Notification::into_payload`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub url: String,
    pub icon: Option<String>,
    pub image: Option<String>,
}

/// What is actually sent to a subscription, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub title: String,
    pub message: String,
    pub url: String,
    pub icon: String,
    pub image: String,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            url: url.into(),
            icon: None,
            image: None,
        }
    }

    pub fn inactivity_reminder(url: impl Into<String>) -> Self {
        Self::new(
            "We miss you!",
            "You haven't logged in or updated your details in a while. Take a moment to review your profile.",
            url,
        )
    }

    pub fn login_alert() -> Self {
        Self::new(
            "New sign-in",
            "Your account was just signed in to. If this wasn't you, change your password.",
            "/profile",
        )
    }

    pub fn password_changed() -> Self {
        Self::new(
            "Password changed",
            "Your password was updated successfully.",
            "/profile",
        )
    }

    pub fn project_created(project_name: &str) -> Self {
        Self::new(
            "New project",
            format!("A new project \"{project_name}\" has been created."),
            "/projects",
        )
    }

    pub fn into_payload(self) -> Payload {
        Payload {
            title: self.title,
            message: self.message,
            url: self.url,
            icon: non_empty_or(self.icon, DEFAULT_ICON),
            image: non_empty_or(self.image, DEFAULT_IMAGE),
        }
    }
}

impl Payload {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value,
        _ => fallback.to_string(),
    }
}
