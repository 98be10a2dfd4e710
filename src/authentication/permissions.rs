use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMemberships,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMemberships,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnMemberships,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let user_uid = &session.user_uid;

        ACTION_TABLE
            .iter()
            .find_map(|(uid, actions)| {
                if user_uid != uid {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: String::from("anna"),
            user_uid: role,
        }
    }

    #[test]
    fn users_manage_only_their_own_data() {
        let user = session(UserRole::User);
        assert!(ActionType::ManageOwnMemberships.authenticate(&user));
        assert!(ActionType::CreateRecipes.authenticate(&user));
        assert!(!ActionType::ManageAllRecipes.authenticate(&user));
    }

    #[test]
    fn admins_manage_all_recipes() {
        let admin = session(UserRole::Admin);
        assert!(ActionType::ManageAllRecipes.authenticate(&admin));
    }
}
