use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::schema::{User, Uuid};

/// One composition edge of a recipe sitting in a user's cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct CartPart {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShoppingList {
    lines: Vec<ShoppingLine>,
}

impl ShoppingList {
    /// Sums amounts per (name, unit), ordered by name then unit.
    ///
    /// Ingredients are grouped by name and unit rather than by id so duplicate
    /// catalog rows still end up on one line. A (recipe, ingredient) edge is
    /// counted once no matter how many times it shows up in `parts`.
    pub fn aggregate<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = CartPart>,
    {
        let mut seen: HashSet<(Uuid, Uuid)> = HashSet::new();
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

        for part in parts {
            if !seen.insert((part.recipe_id, part.ingredient_id)) {
                continue;
            }

            *totals
                .entry((part.name, part.measurement_unit))
                .or_insert(0) += i64::from(part.amount);
        }

        let lines = totals
            .into_iter()
            .map(|((name, measurement_unit), amount)| ShoppingLine {
                name,
                measurement_unit,
                amount,
            })
            .collect();

        Self { lines }
    }

    pub fn lines(&self) -> &[ShoppingLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self, user: &User) -> String {
        let mut text = format!(
            "Shopping list for {} {}\n",
            user.first_name, user.last_name
        );

        for line in &self.lines {
            text.push_str(&format!(
                "{}: {} {}\n",
                line.name, line.amount, line.measurement_unit
            ));
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UserRole;

    fn part(recipe_id: Uuid, ingredient_id: Uuid, name: &str, unit: &str, amount: i32) -> CartPart {
        CartPart {
            recipe_id,
            ingredient_id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn line(name: &str, unit: &str, amount: i64) -> ShoppingLine {
        ShoppingLine {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn merges_shared_ingredients_across_recipes() {
        let list = ShoppingList::aggregate(vec![
            part(1, 10, "flour", "g", 200),
            part(1, 11, "egg", "pcs", 2),
            part(2, 10, "flour", "g", 300),
        ]);

        assert_eq!(
            list.lines(),
            &[line("egg", "pcs", 2), line("flour", "g", 500)]
        );
    }

    #[test]
    fn empty_cart_gives_empty_list() {
        let list = ShoppingList::aggregate(Vec::new());
        assert!(list.is_empty());
        assert_eq!(list, ShoppingList::default());
    }

    #[test]
    fn repeated_edges_are_counted_once() {
        let list = ShoppingList::aggregate(vec![
            part(1, 10, "flour", "g", 200),
            part(1, 10, "flour", "g", 200),
        ]);

        assert_eq!(list.lines(), &[line("flour", "g", 200)]);
    }

    #[test]
    fn duplicate_catalog_rows_share_a_line() {
        let list = ShoppingList::aggregate(vec![
            part(1, 10, "sugar", "g", 50),
            part(2, 42, "sugar", "g", 25),
        ]);

        assert_eq!(list.lines(), &[line("sugar", "g", 75)]);
    }

    #[test]
    fn different_units_stay_apart() {
        let list = ShoppingList::aggregate(vec![
            part(1, 10, "milk", "ml", 200),
            part(2, 11, "milk", "cup", 1),
        ]);

        assert_eq!(
            list.lines(),
            &[line("milk", "cup", 1), line("milk", "ml", 200)]
        );
    }

    #[test]
    fn large_totals_do_not_overflow() {
        let parts = (0..100_000).map(|recipe_id| part(recipe_id, 1, "water", "ml", 32000));
        let list = ShoppingList::aggregate(parts);

        assert_eq!(list.lines(), &[line("water", "ml", 3_200_000_000)]);
    }

    #[test]
    fn render_starts_with_requesting_user() {
        let user = User {
            id: 1,
            email: String::from("anna@example.com"),
            username: String::from("anna"),
            first_name: String::from("Anna"),
            last_name: String::from("Smith"),
            uid: UserRole::User,
        };
        let list = ShoppingList::aggregate(vec![
            part(1, 10, "flour", "g", 200),
            part(1, 11, "egg", "pcs", 2),
        ]);

        assert_eq!(
            list.render(&user),
            "Shopping list for Anna Smith\negg: 2 pcs\nflour: 200 g\n"
        );
    }
}
