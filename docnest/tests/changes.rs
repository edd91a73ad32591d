mod common;

use common::Widget;
use docnest::{bson::doc, memory::InMemoryStore, prelude::*};
use std::collections::HashSet;

fn ids(widgets: &[Widget]) -> Vec<&str> {
    widgets.iter().map(|widget| widget.id.as_str()).collect()
}

#[tokio::test]
async fn first_poll_reports_every_existing_child() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    items
        .add_many(vec![
            Widget::new("a1", "widget", 1),
            Widget::new("a2", "gadget", 2),
            Widget::new("a3", "gizmo", 3),
        ])
        .await?;

    let changes = items.changes().await?;
    assert_eq!(ids(&changes), ["a1", "a2", "a3"]);

    assert!(items.changes().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn later_polls_report_only_new_children() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    assert!(items.changes().await?.is_empty());

    items.add(Widget::new("a1", "widget", 1)).await?;
    assert_eq!(ids(&items.changes().await?), ["a1"]);

    items.add(Widget::new("a2", "gadget", 2)).await?;
    items.document("a1").edit(|widget| widget.stock = 9).await?;
    assert_eq!(ids(&items.changes().await?), ["a2"]);

    items.document("a1").delete().await?;
    assert!(items.changes().await?.is_empty());
    assert_eq!(items.cursor().len().await, 2);

    Ok(())
}

#[tokio::test]
async fn concurrent_polls_never_report_a_child_twice() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    let widgets: Vec<_> = (0..20)
        .map(|n| Widget::new(&format!("w{n}"), "widget", n))
        .collect();
    items.add_many(widgets).await?;

    let twin = items.clone();
    let (left, right) = tokio::join!(items.changes(), twin.changes());
    let (left, right) = (left?, right?);

    let mut seen = HashSet::new();
    for widget in left.iter().chain(right.iter()) {
        assert!(seen.insert(widget.id.clone()), "{} reported twice", widget.id);
    }

    assert_eq!(seen.len(), 20);
    Ok(())
}

#[tokio::test]
async fn fresh_handles_start_over_but_casts_share_the_cursor() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    items.add(Widget::new("a1", "widget", 1)).await?;
    assert_eq!(items.changes().await?.len(), 1);

    let raw = items.cast::<RawItem>()?;
    assert!(raw.changes().await?.is_empty());

    let fresh = orders.collection::<Widget>("items");
    assert_eq!(ids(&fresh.changes().await?), ["a1"]);

    items.cursor().reset().await;
    assert_eq!(items.changes().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn an_undecodable_child_holds_back_the_whole_poll() -> StoreResult<()> {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders").ensure().await?;
    let items = orders.collection::<Widget>("items").ensure().await?;

    items.add(Widget::new("a1", "widget", 1)).await?;
    items
        .cast::<RawItem>()?
        .add(RawItem(doc! { "id": "bad", "name": "broken", "stock": "not-a-number" }))
        .await?;

    assert!(matches!(items.changes().await, Err(StoreError::Serialization(_))));
    assert!(items.cursor().is_empty().await);

    items.document("bad").delete().await?;

    assert_eq!(ids(&items.changes().await?), ["a1"]);
    assert!(items.changes().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn polling_a_missing_collection_fails() {
    let account = Account::new(InMemoryStore::new());
    let orders = account.database("orders");
    let items = orders.collection::<Widget>("items");

    assert!(matches!(items.changes().await, Err(StoreError::NotFound(_))));
    assert!(items.cursor().is_empty().await);
}
