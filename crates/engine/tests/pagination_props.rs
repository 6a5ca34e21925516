//! Property tests for gapless, duplicate-free pagination
//!
//! For any remote page size, display batch size and result count, the
//! concatenation of every batch handed out equals the full result set.

use std::sync::Arc;

use cardscroll_core::{Card, Error, Filters, RemotePage};
use cardscroll_engine::{BatchFill, CacheConfig, LoadMore, PageConsumptionTracker, SearchCache};
use cardscroll_remote::InMemorySearchClient;
use proptest::prelude::*;

fn remote_pages(total: usize, page_size: usize) -> Vec<RemotePage> {
    let cards: Vec<Card> = (0..total)
        .map(|i| Card::new(format!("id-{}", i), format!("card-{:04}", i)))
        .collect();
    if cards.is_empty() {
        return vec![RemotePage::new(Vec::new(), 0, false, 1)];
    }
    cards
        .chunks(page_size)
        .enumerate()
        .map(|(i, chunk)| {
            let end = i * page_size + chunk.len();
            RemotePage::new(chunk.to_vec(), total, end < total, i as u32 + 1)
        })
        .collect()
}

fn sizes() -> impl Strategy<Value = (usize, usize, usize)> {
    (1usize..60).prop_flat_map(|page| (Just(page), 1..=page, 0usize..400))
}

fn load_everything(total: usize, page: usize, batch: usize, fill: BatchFill) -> (Vec<Card>, Vec<usize>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async move {
        let config = CacheConfig {
            remote_page_size: page,
            display_batch_size: batch,
            batch_fill: fill,
            ..CacheConfig::default()
        };
        let client = Arc::new(InMemorySearchClient::numbered(total, page));
        let cache = SearchCache::new(client, &config).unwrap();
        cache.search("card", Filters::new()).await.unwrap();

        let mut batches = vec![cache.pagination().loaded_cards];
        loop {
            match cache.load_more().await {
                Ok(LoadMore::Loaded { batch, .. }) => batches.push(batch),
                Err(Error::Exhausted { .. }) => break,
                other => panic!("unexpected: {:?}", other),
            }
        }
        (cache.cards().as_ref().clone(), batches)
    })
}

proptest! {
    #[test]
    fn tracker_batches_reconstruct_result_set((page_size, batch, total) in sizes()) {
        let pages = remote_pages(total, page_size);
        let mut tracker = PageConsumptionTracker::new(batch);
        let mut seen = Vec::new();
        let mut pages = pages.into_iter();

        let first = pages.next().unwrap();
        seen.extend(tracker.initialize(first));
        loop {
            let consumption = tracker.consume_next(batch);
            prop_assert!(consumption.batch.len() <= batch);
            if consumption.needs_new_remote_page {
                prop_assert!(consumption.batch.is_empty());
                match tracker.next_page_number() {
                    Ok(number) => {
                        let next = pages.next().unwrap();
                        prop_assert_eq!(next.page_number, number);
                        seen.extend(tracker.initialize(next));
                    }
                    Err(Error::Exhausted { .. }) => break,
                    Err(other) => return Err(TestCaseError::fail(other.to_string())),
                }
            } else {
                seen.extend(consumption.batch);
            }
        }

        prop_assert_eq!(seen.len(), total);
        for (i, card) in seen.iter().enumerate() {
            prop_assert_eq!(&card.name, &format!("card-{:04}", i));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cache_load_more_is_gapless((page_size, batch, total) in sizes()) {
        let (cards, batches) = load_everything(total, page_size, batch, BatchFill::PageAligned);
        prop_assert_eq!(cards.len(), total);
        prop_assert_eq!(batches.iter().sum::<usize>(), total);
        prop_assert!(batches.iter().all(|b| *b <= batch));
        for (i, card) in cards.iter().enumerate() {
            prop_assert_eq!(&card.name, &format!("card-{:04}", i));
        }
    }

    #[test]
    fn top_up_batches_are_full_until_the_last((page_size, batch, total) in sizes()) {
        let (cards, batches) = load_everything(total, page_size, batch, BatchFill::TopUp);
        prop_assert_eq!(cards.len(), total);
        if let Some((_, init)) = batches.split_last() {
            prop_assert!(init.iter().all(|b| *b == batch));
        }
        for (i, card) in cards.iter().enumerate() {
            prop_assert_eq!(&card.name, &format!("card-{:04}", i));
        }
    }
}
