use std::sync::Arc;

use crate::{
    events::EventLog,
    repositories::{
        IngredientRepository, ListKind, RecipeListRepository, RecipeRepository, SubscriptionRepository,
        TagRepository, UserRepository,
    },
    PostgresUnitOfWork, PostgresUnitOfWorkSession, StoreResult, UnitOfWork, UnitOfWorkSession,
};

/// One request's view of the database: a session plus repositories bound to it.
///
/// Dropping a store without committing rolls the transaction back.
pub struct Store {
    session: PostgresUnitOfWorkSession,
    events: Arc<EventLog>,
}

impl Store {
    pub async fn begin(uow: &PostgresUnitOfWork) -> StoreResult<Self> {
        let session = uow.begin().await?;
        let events = Arc::new(EventLog::new());
        session.register_transaction_aware(events.clone());
        Ok(Self { session, events })
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.session.executor().clone())
    }

    pub fn tags(&self) -> TagRepository {
        TagRepository::new(self.session.executor().clone())
    }

    pub fn ingredients(&self) -> IngredientRepository {
        IngredientRepository::new(self.session.executor().clone())
    }

    pub fn recipes(&self) -> RecipeRepository {
        RecipeRepository::new(self.session.executor().clone(), self.events.clone())
    }

    pub fn favorites(&self) -> RecipeListRepository {
        self.recipe_list(ListKind::Favorites)
    }

    pub fn shopping_cart(&self) -> RecipeListRepository {
        self.recipe_list(ListKind::ShoppingCart)
    }

    pub fn recipe_list(&self, kind: ListKind) -> RecipeListRepository {
        RecipeListRepository::new(kind, self.session.executor().clone(), self.events.clone())
    }

    pub fn subscriptions(&self) -> SubscriptionRepository {
        SubscriptionRepository::new(self.session.executor().clone(), self.events.clone())
    }

    pub async fn commit(self) -> StoreResult<()> {
        self.session.commit().await
    }

    pub async fn rollback(self) -> StoreResult<()> {
        self.session.rollback().await
    }
}
