pub mod import;
pub mod ingredients;
pub mod relations;
pub mod recipes;
pub mod shopping_cart;
pub mod tags;
pub mod users;

pub use import::*;
pub use ingredients::*;
pub use relations::*;
pub use recipes::*;
pub use shopping_cart::*;
pub use tags::*;
pub use users::*;

#[cfg(test)]
pub(crate) mod fixtures;
