use support_core::models::{Participant, Role};
use tracing::info;
use uuid::Uuid;

use crate::db::user_repository::UserRepository;
use crate::errors::AppError;

const MAX_NAME_LENGTH: usize = 80;

/// Development login: anyone can sign in under any name. The token it hands
/// out is what the `support_session` cookie carries.
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
}

impl AuthService {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    pub async fn login(&self, name: &str, role: Option<Role>) -> Result<(String, Participant), AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::EmptyField {
                field_name: "name".to_string(),
            });
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "name".to_string(),
                max_length: MAX_NAME_LENGTH,
                actual_length: name.chars().count(),
            });
        }

        let user = Participant {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            role: role.unwrap_or(Role::Customer),
            avatar: None,
        };
        let token = Uuid::new_v4().to_string();
        self.users.save(&token, &user).await;
        info!("User {} logged in as {}", user.id, user.role);
        Ok((token, user))
    }

    pub async fn resolve(&self, token: &str) -> Option<Participant> {
        self.users.find_by_token(token).await
    }

    pub async fn logout(&self, token: &str) -> bool {
        self.users.delete(token).await
    }
}
