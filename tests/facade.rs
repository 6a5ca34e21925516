//! End-to-end use of the re-exported API

use std::sync::Arc;

use cardscroll::{
    CacheConfig, Error, Filters, InMemorySearchClient, LoadMore, SearchCache, SearchOutcome,
    SortCriteria, SortDirection, SortOutcome,
};

#[tokio::test]
async fn browse_search_then_sort() {
    let client = Arc::new(InMemorySearchClient::numbered(200, 175));
    let cache = SearchCache::new(Arc::clone(&client), &CacheConfig::default()).unwrap();

    let outcome = cache.search("card", Filters::new()).await.unwrap();
    assert_eq!(outcome, SearchOutcome::Committed { loaded: 75, total: 200 });

    assert!(matches!(
        cache.load_more().await.unwrap(),
        LoadMore::Loaded { batch: 75, loaded: 150, has_more: true }
    ));
    assert_eq!(client.fetch_count(), 1);

    let sorted = cache
        .change_sort("collection", SortCriteria::Name, SortDirection::Desc)
        .await
        .unwrap();
    assert!(matches!(sorted, SortOutcome::Requeried { .. }));
    assert_eq!(cache.cards()[0].name, "card-0199");
    assert_eq!(cache.pagination().loaded_cards, 75);
}

#[tokio::test]
async fn load_more_before_search_is_rejected() {
    let client = Arc::new(InMemorySearchClient::numbered(10, 175));
    let cache = SearchCache::new(client, &CacheConfig::default()).unwrap();
    assert_eq!(cache.load_more().await, Err(Error::NoActiveSearch));
}
