mod common;

use foodgram::{
    cart::{aggregate, IngredientTotal},
    models::{PageRequest, RecipeFilter},
    PostgresUnitOfWork, Store, StoreError,
};

use common::{cleanup_database, draft, new_user, seed_kitchen, setup_database};

fn total(name: &str, unit: &str, total: i64) -> IngredientTotal {
    IngredientTotal {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
        total,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[serial_test::serial]
async fn test_recipe_round_trip_and_update() {
    let pool = setup_database().await;
    let uow = PostgresUnitOfWork::new(pool.clone());
    let k = seed_kitchen(&uow).await;

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    let created = store
        .recipes()
        .create(
            &k.alice,
            &draft("Pancakes", &[&k.breakfast], &[(&k.flour_kg, 1), (&k.sugar_g, 50)]),
        )
        .await
        .expect("Failed to create recipe");
    assert_eq!(created.author.id, k.alice.id);
    assert_eq!(created.tags, vec![k.breakfast.clone()]);
    assert_eq!(created.ingredients.len(), 2);
    assert_eq!(created.ingredients[1].name, "Sugar");
    assert_eq!(created.ingredients[1].amount, 50);

    let updated = store
        .recipes()
        .update(created.id, &draft("Crepes", &[&k.dinner], &[(&k.salt_g, 2)]))
        .await
        .expect("Failed to update recipe");
    assert_eq!(updated.name, "Crepes");
    assert_eq!(updated.tags, vec![k.dinner.clone()]);
    assert_eq!(updated.ingredients.len(), 1, "Update replaces ingredient rows");
    assert_eq!(updated.ingredients[0].measurement_unit, "g");

    let missing = store.recipes().update(created.id + 1000, &draft("X", &[&k.dinner], &[(&k.salt_g, 1)])).await;
    assert!(matches!(missing, Err(StoreError::NotFound("recipe"))));

    store.commit().await.expect("Failed to commit transaction");
    cleanup_database(&pool).await;
    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[serial_test::serial]
async fn test_shopping_cart_aggregates_across_recipes() {
    let pool = setup_database().await;
    let uow = PostgresUnitOfWork::new(pool.clone());
    let k = seed_kitchen(&uow).await;

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    let a = store
        .recipes()
        .create(&k.alice, &draft("A", &[&k.breakfast], &[(&k.salt_g, 5), (&k.flour_kg, 1)]))
        .await
        .expect("Failed to create recipe A");
    let b = store
        .recipes()
        .create(&k.alice, &draft("B", &[&k.dinner], &[(&k.salt_g, 3), (&k.sugar_g, 2)]))
        .await
        .expect("Failed to create recipe B");
    let c = store
        .recipes()
        .create(&k.alice, &draft("C", &[&k.dinner], &[(&k.salt_tsp, 2)]))
        .await
        .expect("Failed to create recipe C");

    let cart = store.shopping_cart();
    assert!(aggregate(&cart.cart_recipes(k.bob.id).await.expect("Failed to load cart")).is_empty());

    for id in [a.id, b.id, c.id] {
        cart.add(k.bob.id, id).await.expect("Failed to add to cart");
    }

    let totals = aggregate(&cart.cart_recipes(k.bob.id).await.expect("Failed to load cart"));
    assert_eq!(
        totals,
        vec![
            total("Flour", "kg", 1),
            total("Salt", "g", 8),
            total("Salt", "tsp", 2),
            total("Sugar", "g", 2),
        ]
    );

    // Alice's cart is independent of Bob's.
    assert!(cart.cart_recipes(k.alice.id).await.expect("Failed to load cart").is_empty());

    store.commit().await.expect("Failed to commit transaction");
    cleanup_database(&pool).await;
    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[serial_test::serial]
async fn test_duplicate_and_missing_list_entries() {
    let pool = setup_database().await;
    let uow = PostgresUnitOfWork::new(pool.clone());
    let k = seed_kitchen(&uow).await;

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    let recipe = store
        .recipes()
        .create(&k.alice, &draft("Soup", &[&k.dinner], &[(&k.salt_g, 4)]))
        .await
        .expect("Failed to create recipe");

    let summary = store.shopping_cart().add(k.bob.id, recipe.id).await.expect("Failed to add to cart");
    assert_eq!(summary.name, "Soup");
    assert!(matches!(
        store.shopping_cart().add(k.bob.id, recipe.id).await,
        Err(StoreError::Conflict(_))
    ));
    assert!(matches!(
        store.favorites().add(k.bob.id, recipe.id + 1000).await,
        Err(StoreError::NotFound("recipe"))
    ));
    assert!(matches!(
        store.favorites().remove(k.bob.id, recipe.id).await,
        Err(StoreError::NotFound(_))
    ));

    store.shopping_cart().remove(k.bob.id, recipe.id).await.expect("Failed to remove from cart");
    assert!(!store.shopping_cart().contains(k.bob.id, recipe.id).await.expect("Failed to query cart"));

    store.commit().await.expect("Failed to commit transaction");
    cleanup_database(&pool).await;
    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[serial_test::serial]
async fn test_deleting_recipe_cleans_up_carts_and_favorites() {
    let pool = setup_database().await;
    let uow = PostgresUnitOfWork::new(pool.clone());
    let k = seed_kitchen(&uow).await;

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    let recipe = store
        .recipes()
        .create(&k.alice, &draft("Stew", &[&k.dinner], &[(&k.flour_kg, 1)]))
        .await
        .expect("Failed to create recipe");
    store.shopping_cart().add(k.bob.id, recipe.id).await.expect("Failed to add to cart");
    store.shopping_cart().add(k.alice.id, recipe.id).await.expect("Failed to add to cart");
    store.favorites().add(k.bob.id, recipe.id).await.expect("Failed to favorite");
    store.commit().await.expect("Failed to commit transaction");

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    store.recipes().delete(recipe.id).await.expect("Failed to delete recipe");
    assert!(store.events().pending().contains(&foodgram::events::DomainEvent::RecipeDeleted {
        recipe_id: recipe.id,
        cart_entries: 2,
        favorites: 1,
    }));
    store.commit().await.expect("Failed to commit transaction");

    for table in ["shopping_cart", "favorites", "recipe_tags", "recipe_ingredients", "recipes"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .expect("Failed to count rows");
        assert_eq!(count, 0, "{table} should be empty after delete");
    }

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    assert!(matches!(
        store.recipes().delete(recipe.id).await,
        Err(StoreError::NotFound("recipe"))
    ));
    drop(store);

    cleanup_database(&pool).await;
    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[serial_test::serial]
async fn test_recipe_list_filters_and_pages() {
    let pool = setup_database().await;
    let uow = PostgresUnitOfWork::new(pool.clone());
    let k = seed_kitchen(&uow).await;

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    let mut ids = Vec::new();
    for (i, author) in [&k.alice, &k.alice, &k.bob].into_iter().enumerate() {
        let tag = if i == 2 { &k.dinner } else { &k.breakfast };
        let recipe = store
            .recipes()
            .create(author, &draft(&format!("Dish {i}"), &[tag], &[(&k.salt_g, 1)]))
            .await
            .expect("Failed to create recipe");
        ids.push(recipe.id);
    }
    store.favorites().add(k.bob.id, ids[0]).await.expect("Failed to favorite");
    store.shopping_cart().add(k.bob.id, ids[2]).await.expect("Failed to add to cart");

    let recipes = store.recipes();
    let everything = recipes
        .list(&RecipeFilter::default(), PageRequest { page: 1, limit: 2 })
        .await
        .expect("Failed to list recipes");
    assert_eq!(everything.count, 3);
    assert_eq!(everything.results.len(), 2);
    assert_eq!(everything.next, Some(2));
    assert_eq!(everything.results[0].id, ids[2], "Newest recipe comes first");

    let second = recipes
        .list(&RecipeFilter::default(), PageRequest { page: 2, limit: 2 })
        .await
        .expect("Failed to list recipes");
    assert_eq!(second.results.len(), 1);
    assert_eq!(second.previous, Some(1));
    assert_eq!(second.next, None);

    let by_tag = recipes
        .list(
            &RecipeFilter {
                tags: vec!["breakfast".to_string()],
                ..Default::default()
            },
            PageRequest { page: 1, limit: 10 },
        )
        .await
        .expect("Failed to list recipes");
    assert_eq!(by_tag.count, 2);

    let by_author = recipes
        .list(
            &RecipeFilter {
                author: Some(k.bob.id),
                ..Default::default()
            },
            PageRequest { page: 1, limit: 10 },
        )
        .await
        .expect("Failed to list recipes");
    assert_eq!(by_author.results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[2]]);

    let favorited = recipes
        .list(
            &RecipeFilter {
                favorited_by: Some(k.bob.id),
                ..Default::default()
            },
            PageRequest { page: 1, limit: 10 },
        )
        .await
        .expect("Failed to list recipes");
    assert_eq!(favorited.results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[0]]);

    let in_cart = recipes
        .list(
            &RecipeFilter {
                in_cart_of: Some(k.bob.id),
                tags: vec!["breakfast".to_string()],
                ..Default::default()
            },
            PageRequest { page: 1, limit: 10 },
        )
        .await
        .expect("Failed to list recipes");
    assert_eq!(in_cart.count, 0, "Filters combine with AND");

    store.commit().await.expect("Failed to commit transaction");
    cleanup_database(&pool).await;
    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[serial_test::serial]
async fn test_subscriptions() {
    let pool = setup_database().await;
    let uow = PostgresUnitOfWork::new(pool.clone());
    let k = seed_kitchen(&uow).await;

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    let subs = store.subscriptions();

    assert!(matches!(subs.subscribe(k.alice.id, k.alice.id).await, Err(StoreError::Invalid(_))));
    assert!(matches!(subs.subscribe(k.alice.id, k.bob.id + 1000).await, Err(StoreError::NotFound("user"))));

    let sub = subs.subscribe(k.alice.id, k.bob.id).await.expect("Failed to subscribe");
    assert_eq!(sub.subscriber, "alice");
    assert_eq!(sub.author, "bob");
    assert!(matches!(subs.subscribe(k.alice.id, k.bob.id).await, Err(StoreError::Conflict(_))));

    assert!(subs.is_subscribed(k.alice.id, k.bob.id).await.expect("Failed to query"));
    assert!(!subs.is_subscribed(k.bob.id, k.alice.id).await.expect("Failed to query"));
    assert_eq!(subs.list_for(k.alice.id).await.expect("Failed to list"), vec![sub]);

    subs.unsubscribe(k.alice.id, k.bob.id).await.expect("Failed to unsubscribe");
    assert!(matches!(subs.unsubscribe(k.alice.id, k.bob.id).await, Err(StoreError::NotFound(_))));

    store.commit().await.expect("Failed to commit transaction");
    cleanup_database(&pool).await;
    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[serial_test::serial]
async fn test_users_list_in_pages() {
    let pool = setup_database().await;
    let uow = PostgresUnitOfWork::new(pool.clone());
    let k = seed_kitchen(&uow).await;

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    let carol = store.users().create(&new_user("carol")).await.expect("Failed to create carol");

    let first = store
        .users()
        .list(PageRequest { page: 1, limit: 2 })
        .await
        .expect("Failed to list users");
    assert_eq!(first.count, 3);
    assert_eq!(first.next, Some(2));
    assert_eq!(first.results, vec![k.alice.clone(), k.bob.clone()]);

    let second = store
        .users()
        .list(PageRequest { page: 2, limit: 2 })
        .await
        .expect("Failed to list users");
    assert_eq!(second.next, None);
    assert_eq!(second.previous, Some(1));
    assert_eq!(second.results, vec![carol]);

    assert!(matches!(store.users().get(k.bob.id + 1000).await, Err(StoreError::NotFound("user"))));

    store.commit().await.expect("Failed to commit transaction");
    cleanup_database(&pool).await;
    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
#[serial_test::serial]
async fn test_catalog_constraints_and_search() {
    let pool = setup_database().await;
    let uow = PostgresUnitOfWork::new(pool.clone());
    let k = seed_kitchen(&uow).await;

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    let ingredients = store.ingredients();

    let salts = ingredients.search(Some("sA")).await.expect("Failed to search");
    assert_eq!(salts, vec![k.salt_g.clone(), k.salt_tsp.clone()]);
    assert_eq!(ingredients.search(None).await.expect("Failed to search").len(), 4);
    assert_eq!(
        ingredients.missing(&[k.salt_g.id, -1]).await.expect("Failed to check ids"),
        vec![-1]
    );
    assert!(store.tags().missing(&[k.breakfast.id, k.dinner.id]).await.expect("Failed to check ids").is_empty());
    store.commit().await.expect("Failed to commit transaction");

    // A constraint violation aborts the transaction, so each attempt gets its own.
    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    assert!(matches!(store.ingredients().create("Salt", "g").await, Err(StoreError::Conflict(_))));
    drop(store);

    let store = Store::begin(&uow).await.expect("Failed to begin transaction");
    assert!(matches!(
        store.tags().create("Other", "#000000", "breakfast").await,
        Err(StoreError::Conflict(_))
    ));
    drop(store);

    cleanup_database(&pool).await;
    pool.close().await;
}
