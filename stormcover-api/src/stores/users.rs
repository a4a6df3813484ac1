use crate::models::{Coverage, User};

use super::{StoreResult, UserDirectory};

/// Stand-in for the external user system. The roster is seeded at
/// construction; the engine only ever reads it.
pub struct StaticUserDirectory {
    users: Vec<User>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self {
            users: seed_users(),
        }
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self { users }
    }
}

impl Default for StaticUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDirectory for StaticUserDirectory {
    fn get_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.clone())
    }
}

fn seed_users() -> Vec<User> {
    vec![
        User {
            id: 1,
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: "john.doe@example.com".into(),
            city: "Chicago".into(),
            state: "IL".into(),
            coverages: vec![Coverage {
                id: 1,
                name: "Health".into(),
                details: "Standard Health".into(),
            }],
        },
        User {
            id: 2,
            first_name: "Jane".into(),
            last_name: "Smith".into(),
            email: "jane.smith@example.com".into(),
            city: "New York".into(),
            state: "NY".into(),
            coverages: vec![
                Coverage {
                    id: 2,
                    name: "Vehicle".into(),
                    details: "Full Coverage".into(),
                },
                Coverage {
                    id: 3,
                    name: "Fire".into(),
                    details: "Home Fire Insurance".into(),
                },
            ],
        },
        User {
            id: 3,
            first_name: "Bob".into(),
            last_name: "Jones".into(),
            email: "bob.jones@example.com".into(),
            city: "Chicago".into(),
            state: "IL".into(),
            coverages: vec![Coverage {
                id: 2,
                name: "Vehicle".into(),
                details: "Liability Only".into(),
            }],
        },
    ]
}
