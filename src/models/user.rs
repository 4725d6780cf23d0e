use serde::{Deserialize, Serialize};

/// A skill a user knows or wants, as free-form text. Matching compares
/// names by exact string equality; no canonicalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub roll_number: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub department: Option<String>,
    pub year: Option<String>,
    pub bio: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub profile_image: Option<String>,
    pub skills_known: Vec<Skill>,
    pub skills_wanted: Vec<Skill>,
    pub interests: Vec<String>,
    /// Reputation fields exist in the schema but are never written here.
    pub rating: f64,
    pub total_ratings: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Minimal public card shown on listings.
#[derive(Debug, Clone, Serialize)]
pub struct UserBrief {
    pub id: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

/// Profile embedded in a project view. Redacted contact fields are
/// omitted from the JSON entirely.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl User {
    pub fn brief(&self) -> UserBrief {
        UserBrief {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            profile_image: self.profile_image.clone(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            email: Some(self.email.clone()),
            phone_number: self.phone_number.clone(),
            profile_image: self.profile_image.clone(),
        }
    }
}

impl UserProfile {
    /// Strip contact fields for non-participant viewers.
    pub fn redacted(mut self) -> Self {
        self.email = None;
        self.phone_number = None;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterUser {
    pub full_name: String,
    pub roll_number: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
    pub bio: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub profile_image: Option<String>,
    pub skills_known: Option<Vec<Skill>>,
    pub skills_wanted: Option<Vec<Skill>>,
    pub interests: Option<Vec<String>>,
}
