pub mod catalog;
pub mod lists;
pub mod recipes;
pub mod subscriptions;
pub mod users;

pub use catalog::{IngredientRepository, TagRepository};
pub use lists::{ListKind, RecipeListRepository};
pub use recipes::RecipeRepository;
pub use subscriptions::SubscriptionRepository;
pub use users::{TokenRepository, UserRepository};
