mod common;

use common::{Sku, Widget};
use docnest::{memory::InMemoryStore, prelude::*};
use futures::TryStreamExt;
use std::sync::Arc;

#[tokio::test]
async fn document_lifecycle_follows_its_link() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());

    let orders = account.database("orders").create(DatabaseInfo::default()).await?;
    let items = orders
        .collection::<Widget>("items")
        .create(CollectionInfo::default())
        .await?;
    let a1 = items
        .document("")
        .create(Widget::new("a1", "widget", 1))
        .await?;

    assert_eq!(a1.id(), "a1");
    assert_eq!(a1.link().as_str(), "/dbs/orders/colls/items/docs/a1");
    assert_eq!(a1.read().await?, Widget::new("a1", "widget", 1));

    a1.delete().await?;

    assert!(matches!(a1.read().await, Err(StoreError::NotFound(link)) if link == *a1.link()));
    Ok(())
}

#[tokio::test]
async fn links_are_computed_without_the_store() {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders");
    let items = orders.collection::<Widget>("items");
    let a1 = items.document("a1");

    assert!(account.link().is_root());
    assert_eq!(orders.link().as_str(), "/dbs/orders");
    assert_eq!(items.link().as_str(), "/dbs/orders/colls/items");
    assert_eq!(a1.link_async().await.as_str(), "/dbs/orders/colls/items/docs/a1");
    assert_eq!(a1.link().parent().as_ref(), Some(items.link()));

    assert!(matches!(a1.read().await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn creating_under_a_missing_parent_fails() {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders");
    let items = orders.collection::<Widget>("items");

    let result = items.document("a1").create(Widget::new("a1", "widget", 1)).await;

    assert!(matches!(result, Err(StoreError::NotFound(link)) if link == *items.link()));
}

#[tokio::test]
async fn duplicate_creates_conflict() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;

    let result = account.database("orders").create(DatabaseInfo::default()).await;
    assert!(matches!(result, Err(StoreError::Conflict(link)) if link == *orders.link()));

    Ok(())
}

#[tokio::test]
async fn payload_ids_decide_where_resources_land() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    let result = items.document("a1").ensure_with(Widget::new("b2", "widget", 1)).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    let sibling = items.document("a1").create(Widget::new("b2", "widget", 1)).await?;
    assert_eq!(sibling.link().as_str(), "/dbs/orders/colls/items/docs/b2");

    let result = account.database("bad/name").create(DatabaseInfo::default()).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn handles_bound_to_reserved_ids_fail_validation() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;
    items.add(Widget::new("a1", "widget", 1)).await?;

    let deep = account.database("a/b/c/d/e/f/g/h");
    assert!(matches!(deep.link().components(), Err(StoreError::Validation(_))));
    assert!(matches!(deep.read().await, Err(StoreError::Validation(_))));
    assert!(matches!(deep.delete().await, Err(StoreError::Validation(_))));

    let aliased = account.database("orders/colls/items");
    assert!(matches!(aliased.read().await, Err(StoreError::Validation(_))));
    assert!(matches!(aliased.delete().await, Err(StoreError::Validation(_))));

    let nested = aliased.collection::<Widget>("docs");
    assert!(matches!(nested.read().await, Err(StoreError::Validation(_))));
    assert!(matches!(nested.changes().await, Err(StoreError::Validation(_))));
    assert!(matches!(
        items.document("a1/x").update(Widget::new("a1/x", "widget", 1)).await,
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(items.document("a?1").delete().await, Err(StoreError::Validation(_))));

    assert_eq!(items.read().await?.id, "items");
    assert_eq!(items.query().fetch().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn documents_without_an_id_get_one_from_the_store() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    let created = items.document("").create(Widget::new("", "widget", 1)).await?;

    assert!(!created.id().is_empty());
    assert_eq!(created.read().await?.id, created.id());
    Ok(())
}

#[tokio::test]
async fn create_many_keeps_input_order() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    let created = items
        .document("")
        .create_many(vec![
            Widget::new("c", "third", 3),
            Widget::new("a", "first", 1),
            Widget::new("b", "second", 2),
        ])
        .await?;

    let ids: Vec<_> = created.iter().map(|document| document.id().to_string()).collect();
    assert_eq!(ids, ["c", "a", "b"]);

    let collections = orders
        .collection::<Widget>("")
        .create_many(vec![CollectionInfo::with_id("x"), CollectionInfo::with_id("y")])
        .await?;

    assert_eq!(collections[1].link().as_str(), "/dbs/orders/colls/y");
    Ok(())
}

#[tokio::test]
async fn update_replaces_the_payload() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;
    let a1 = items.document("a1").create(Widget::new("a1", "widget", 1)).await?;

    a1.update(Widget::new("a1", "gadget", 7)).await?;
    assert_eq!(a1.read().await?, Widget::new("a1", "gadget", 7));

    let result = a1.update(Widget::new("zz", "gadget", 7)).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    a1.delete().await?;
    let result = a1.update(Widget::new("a1", "gadget", 7)).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn edit_applies_the_mutator_once() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;
    let a1 = items.document("a1").create(Widget::new("a1", "widget", 1)).await?;

    a1.edit(|widget| widget.stock += 10).await?;
    assert_eq!(a1.read().await?.stock, 11);

    let result = a1.edit(|widget| widget.id = "b2".into()).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));
    assert_eq!(a1.read().await?.id, "a1");

    Ok(())
}

#[tokio::test]
async fn collections_record_their_schema() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    let info = items.read().await?;
    assert_eq!(info.id, "items");
    assert_eq!(info.schema.as_deref(), Some(Collection::<InMemoryStore, Widget>::schema_tag()));

    items
        .edit(|info| info.schema = Some("widgets-v2".into()))
        .await?;
    assert_eq!(items.read().await?.schema.as_deref(), Some("widgets-v2"));

    Ok(())
}

#[tokio::test]
async fn add_chains_and_clear_empties() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    items
        .add(Widget::new("a1", "widget", 1))
        .await?
        .add_many(vec![Widget::new("a2", "gadget", 2), Widget::new("a3", "gizmo", 3)])
        .await?;

    assert_eq!(items.query().fetch().await?.len(), 3);

    items.clear().await?;

    assert!(items.query().fetch().await?.is_empty());
    assert!(items.read().await.is_ok());
    Ok(())
}

#[tokio::test]
async fn deleting_a_database_removes_its_subtree() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;
    items.add(Widget::new("a1", "widget", 1)).await?;

    orders.delete().await?;

    assert!(matches!(items.read().await, Err(StoreError::NotFound(_))));
    assert!(matches!(items.document("a1").read().await, Err(StoreError::NotFound(_))));
    assert!(matches!(orders.delete().await, Err(StoreError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn queries_filter_sort_and_window() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    items
        .add_many(vec![
            Widget::new("a1", "widget", 4),
            Widget::new("a2", "gadget", 9),
            Widget::new("a3", "gizmo", 1),
            Widget::new("a4", "widget-xl", 6),
            Widget::new("a5", "doohickey", 3),
        ])
        .await?;

    let stocked = items
        .query()
        .filter(Filter::gt("stock", 2))
        .sort("stock", SortDirection::Desc)
        .limit(3)
        .fetch()
        .await?;
    let ids: Vec<_> = stocked.iter().map(|widget| widget.id.as_str()).collect();
    assert_eq!(ids, ["a2", "a4", "a1"]);

    let widgets = items
        .query()
        .filter(Filter::starts_with("name", "widget").or(Filter::eq("id", "a3")))
        .fetch()
        .await?;
    assert_eq!(widgets.len(), 3);

    let second = items
        .query()
        .sort("name", SortDirection::Asc)
        .offset(1)
        .first()
        .await?;
    assert_eq!(second.map(|widget| widget.name), Some("gadget".to_string()));

    let none = items.query().filter(Filter::eq("name", "sprocket")).first().await?;
    assert!(none.is_none());

    Ok(())
}

#[tokio::test]
async fn listings_are_lazy_and_restartable() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    let listing = items.query().sort("id", SortDirection::Asc);
    assert!(listing.fetch().await?.is_empty());

    items.add(Widget::new("a1", "widget", 1)).await?;
    let stream = listing.stream();
    items.add(Widget::new("a2", "gadget", 2)).await?;

    let streamed: Vec<Widget> = stream.try_collect().await?;
    assert_eq!(streamed.len(), 2);
    assert_eq!(listing.fetch().await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn wrapped_queries_yield_live_handles() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    orders.add(CollectionInfo::with_id("items")).await?;
    orders.add(CollectionInfo::with_id("archive")).await?;

    let collections = orders.query_wrapped().fetch().await?;
    let links: Vec<_> = collections.iter().map(|collection| collection.link().as_str()).collect();
    assert_eq!(links, ["/dbs/orders/colls/items", "/dbs/orders/colls/archive"]);

    let items = orders.collection::<Widget>("items");
    items.add(Widget::new("a1", "widget", 1)).await?;

    for document in items.query_wrapped().fetch().await? {
        assert_eq!(document.read().await?.name, "widget");
    }

    let databases = account.query_wrapped().fetch().await?;
    assert_eq!(databases.len(), 1);
    assert!(databases[0].same_resource(&orders));

    Ok(())
}

#[tokio::test]
async fn account_reads_and_lists_databases() -> StoreResult<()> {
    let account = Account::connect(InMemoryStore::builder().account("shop")).await?;

    assert_eq!(account.read().await?.id, "shop");
    assert_eq!(account.ensure().await?.read().await?.id, "shop");

    account
        .add(DatabaseInfo::with_id("orders"))
        .await?
        .add_many(vec![DatabaseInfo::with_id("billing")])
        .await?;

    let ids: Vec<_> = account
        .query()
        .fetch()
        .await?
        .into_iter()
        .map(|info| info.id)
        .collect();
    assert_eq!(ids, ["orders", "billing"]);

    account.clear().await?;
    assert!(account.query().fetch().await?.is_empty());

    account.shutdown().await
}

#[tokio::test]
async fn erased_accounts_behave_the_same() -> StoreResult<()> {
    let account: Account<Arc<dyn StoreBackend>> = Account::new(InMemoryStore::new()).into_dyn();

    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;
    items.add(Widget::new("a1", "widget", 1)).await?;

    assert_eq!(items.document("a1").read().await?.name, "widget");
    assert_eq!(account.read().await?.id, "local");
    Ok(())
}

#[tokio::test]
async fn derived_items_may_rename_their_id() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let catalog = account.database("catalog").ensure().await?;
    let skus = catalog.collection::<Sku>("skus").ensure().await?;

    let sku = skus
        .document("")
        .create(Sku { code: "SKU-1".into(), label: "bolt".into() })
        .await?;

    assert_eq!(sku.link().as_str(), "/dbs/catalog/colls/skus/docs/SKU-1");
    assert_eq!(sku.read().await?.code, "SKU-1");
    assert_eq!(Sku::with_id("SKU-2").code, "SKU-2");
    Ok(())
}

#[test]
fn blocking_forms_match_async_ones() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());

    let orders = account.database("orders").ensure_blocking()?;
    let items = orders.collection::<Widget>("items").ensure_blocking()?;

    let a1 = items
        .document("a1")
        .create_blocking(Widget::new("a1", "widget", 1))?;
    a1.edit_blocking(|widget| widget.stock = 5)?;

    assert_eq!(a1.read_blocking()?.stock, 5);
    assert_eq!(items.changes_blocking()?.len(), 1);
    assert_eq!(items.query().fetch_blocking()?.len(), 1);

    items.clear_blocking()?;
    assert!(matches!(a1.read_blocking(), Err(StoreError::NotFound(_))));

    orders.delete_blocking()
}
