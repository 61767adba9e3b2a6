use super::user::User;
use serde::{Deserialize, Serialize};

/// Cursor value requesting the first page.
pub const START_CURSOR: i64 = -1;
/// `next_cursor` value marking the last page.
pub const END_CURSOR: i64 = 0;

/// One page of a cursored user collection (friends, list members).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub next_cursor: i64,
}

impl UserPage {
    pub fn is_last(&self) -> bool {
        self.next_cursor == END_CURSOR
    }
}
