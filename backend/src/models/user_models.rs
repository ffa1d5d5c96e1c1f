use diesel::prelude::*;
use crate::schema::users;
use crate::schema::sessions;

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub email: String,
    pub password_hash: Option<String>, // None for accounts that only ever signed in through oauth
    pub oauth_provider: Option<String>, // "google", "yandex" or "vk"
    pub oauth_id: Option<String>, // subject id at the provider
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: i32,
    pub last_login: Option<i32>, // unix timestamp of last successful login
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: i32,
}

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Session {
    pub id: i32,
    pub user_id: i32,
    pub token: String,
    pub expires_at: i32,
    pub user_agent: Option<String>,
    pub created_at: i32,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub user_id: i32,
    pub token: String,
    pub expires_at: i32,
    pub user_agent: Option<String>,
    pub created_at: i32,
}
