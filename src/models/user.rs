use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The projection of an account record this crate reads.
/// Persistence of the full record is an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
}

impl User {
    pub fn new(email: &str, first_name: &str, last_name: &str, phone: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: phone.to_string(),
            password_hash: String::new(),
            is_active: true,
        }
    }

    /// Name used to address the user in notifications
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();

        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}
