use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, ValidationError};

/// The locally registered user. There is no server-side account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Captured face as a `data:<mime>;base64,<payload>` URI.
    #[serde(rename = "faceDataUri")]
    pub face_image: String,
}

impl User {
    /// Create a new profile from a registration form.
    pub fn register(name: &str, face_image: &str) -> Result<Self, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if face_image.trim().is_empty() {
            return Err(Error::Capture(
                "Could not capture an image. Please check your camera and permissions.".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            face_image: face_image.to_string(),
        })
    }

    /// Up to two initials for the avatar fallback.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .collect()
    }
}

/// Marker that a user is logged in on this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "userId")]
    pub user_id: String,
}
