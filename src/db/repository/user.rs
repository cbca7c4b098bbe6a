//! User rows and invite codes.
//!
//! Only the identity data the care feature needs lives here; credentials
//! and sessions are handled upstream of this library.

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::User;

const INVITE_CODE_LEN: usize = 8;
// No 0/O/1/I — codes get read aloud and typed on phones.
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate an invite code not yet present in `users`.
pub fn generate_invite_code(conn: &Connection) -> Result<String, StoreError> {
    let mut rng = rand::thread_rng();
    loop {
        let code: String = (0..INVITE_CODE_LEN)
            .map(|_| INVITE_CODE_ALPHABET[rng.gen_range(0..INVITE_CODE_ALPHABET.len())] as char)
            .collect();
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE invite_code = ?1",
            params![code],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(code);
        }
    }
}

/// Create and insert a user with a fresh id and invite code.
pub fn create_user(conn: &Connection, username: &str) -> Result<User, StoreError> {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        nickname: None,
        avatar_url: None,
        phone: None,
        invite_code: generate_invite_code(conn)?,
    };
    insert_user(conn, &user)?;
    Ok(user)
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO users (id, username, nickname, avatar_url, phone, invite_code)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id.to_string(),
            user.username,
            user.nickname,
            user.avatar_url,
            user.phone,
            user.invite_code,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, StoreError> {
    conn.query_row(
        "SELECT id, username, nickname, avatar_url, phone, invite_code
         FROM users WHERE id = ?1",
        params![id.to_string()],
        user_from_row,
    )
    .optional()
    .map_err(StoreError::from)
}

pub fn find_user_by_invite_code(
    conn: &Connection,
    invite_code: &str,
) -> Result<Option<User>, StoreError> {
    conn.query_row(
        "SELECT id, username, nickname, avatar_url, phone, invite_code
         FROM users WHERE invite_code = ?1",
        params![invite_code],
        user_from_row,
    )
    .optional()
    .map_err(StoreError::from)
}

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row
            .get::<_, String>(0)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        username: row.get(1)?,
        nickname: row.get(2)?,
        avatar_url: row.get(3)?,
        phone: row.get(4)?,
        invite_code: row.get(5)?,
    })
}
