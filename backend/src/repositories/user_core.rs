use diesel::prelude::*;
use crate::{
    error::RepositoryError,
    models::user_models::{User, NewUser},
    schema::users,
    DbPool,
};

pub struct UserCore {
    pool: DbPool
}

impl UserCore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // Core user operations
    pub fn create_user(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let mut conn = self.pool.get()?;
        let user = conn
            .transaction(|conn| {
                diesel::insert_into(users::table)
                    .values(&new_user)
                    .execute(conn)?;
                users::table
                    .filter(users::email.eq(&new_user.email))
                    .select(User::as_select())
                    .first::<User>(conn)
            })
            .map_err(RepositoryError::from_insert)?;
        Ok(user)
    }

    pub fn find_by_email(&self, search_email: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let user = users::table
            .filter(users::email.eq(search_email))
            .select(User::as_select())
            .first::<User>(&mut conn)
            .optional()?;
        Ok(user)
    }

    pub fn email_exists(&self, search_email: &str) -> Result<bool, RepositoryError> {
        Ok(self.find_by_email(search_email)?.is_some())
    }

    pub fn find_by_oauth(&self, provider: &str, subject: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let user = users::table
            .filter(users::oauth_provider.eq(provider))
            .filter(users::oauth_id.eq(subject))
            .select(User::as_select())
            .first::<User>(&mut conn)
            .optional()?;
        Ok(user)
    }

    /// Attaches a provider identity to an account that registered with a
    /// password first, so both ways of signing in land on the same user.
    pub fn link_oauth_identity(&self, user_id: i32, provider: &str, subject: &str) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;
        diesel::update(users::table.find(user_id))
            .set((
                users::oauth_provider.eq(Some(provider)),
                users::oauth_id.eq(Some(subject)),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn update_last_login(&self, user_id: i32, timestamp: i32) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;
        diesel::update(users::table.find(user_id))
            .set(users::last_login.eq(Some(timestamp)))
            .execute(&mut conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;

    fn password_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: Some("hash".to_string()),
            oauth_provider: None,
            oauth_id: None,
            full_name: None,
            avatar_url: None,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn created_user_can_be_found_by_email() {
        let core = UserCore::new(memory_pool());
        let user = core.create_user(password_user("a@example.com")).unwrap();

        assert_eq!(core.find_by_email("a@example.com").unwrap().unwrap().id, user.id);
        assert_eq!(user.email, "a@example.com");
        assert!(core.email_exists("a@example.com").unwrap());
        assert!(!core.email_exists("b@example.com").unwrap());
    }

    #[test]
    fn duplicate_email_is_rejected_by_the_database() {
        let core = UserCore::new(memory_pool());
        core.create_user(password_user("a@example.com")).unwrap();
        assert!(matches!(
            core.create_user(password_user("a@example.com")),
            Err(RepositoryError::Duplicate)
        ));
    }

    #[test]
    fn linked_identity_is_found_by_provider_subject() {
        let core = UserCore::new(memory_pool());
        let user = core.create_user(password_user("a@example.com")).unwrap();
        core.link_oauth_identity(user.id, "google", "123").unwrap();

        let found = core.find_by_oauth("google", "123").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(core.find_by_oauth("yandex", "123").unwrap().is_none());
    }

    #[test]
    fn last_login_is_recorded() {
        let core = UserCore::new(memory_pool());
        let user = core.create_user(password_user("a@example.com")).unwrap();
        assert_eq!(user.last_login, None);

        core.update_last_login(user.id, 42).unwrap();
        assert_eq!(core.find_by_email("a@example.com").unwrap().unwrap().last_login, Some(42));
    }
}
