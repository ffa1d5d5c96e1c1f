use diesel::prelude::*;
use crate::{
    error::RepositoryError,
    models::user_models::{Session, NewSession},
    schema::sessions,
    DbPool,
};

/// Server side record of every token handed out, so a token can be checked
/// against an unexpired row and revoked on logout.
pub struct SessionRepository {
    pool: DbPool
}

impl SessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn save_session(&self, new_session: NewSession) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(sessions::table)
            .values(&new_session)
            .execute(&mut conn)?;
        Ok(())
    }

    /// Returns the session for `token` only if it has not expired at `now`.
    pub fn find_active(&self, token: &str, now: i32) -> Result<Option<Session>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let session = sessions::table
            .filter(sessions::token.eq(token))
            .filter(sessions::expires_at.gt(now))
            .select(Session::as_select())
            .first::<Session>(&mut conn)
            .optional()?;
        Ok(session)
    }

    pub fn delete_by_token(&self, token: &str) -> Result<usize, RepositoryError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(sessions::table.filter(sessions::token.eq(token)))
            .execute(&mut conn)?;
        Ok(deleted)
    }

    pub fn purge_expired(&self, now: i32) -> Result<usize, RepositoryError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(sessions::table.filter(sessions::expires_at.le(now)))
            .execute(&mut conn)?;
        Ok(deleted)
    }
}
