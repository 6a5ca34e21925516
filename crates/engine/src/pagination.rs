//! Page consumption tracking
//!
//! The remote API hands out fixed-size pages (175 cards) while the UI asks for
//! smaller display batches (75 cards). The two sizes are not multiples of each
//! other, so the tracker keeps exactly one remote page and an offset into it,
//! and serves batches from that offset until the page is used up.
//!
//! ```text
//! page 1: [0 ............................ 175)
//!          |-- 75 --|-- 75 --|- 25 -|
//!                                   ^ needs_new_remote_page
//! page 2: [175 .......................... 350)
//!          |-- 75 --|-- 75 --|- 25 -|
//! ```
//!
//! Concatenating every batch in order reconstructs the remote result set with
//! no card skipped and none repeated.

use std::str::FromStr;

use cardscroll_core::{Card, Error, RemotePage, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// How a display batch that straddles a page boundary is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchFill {
    /// Hand out the short remainder of the page; the next batch fetches
    #[default]
    PageAligned,
    /// Fetch the next page right away and top the batch up to full size
    TopUp,
}

impl BatchFill {
    /// Config spelling of the variant
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchFill::PageAligned => "page-aligned",
            BatchFill::TopUp => "top-up",
        }
    }
}

impl FromStr for BatchFill {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "page-aligned" => Ok(BatchFill::PageAligned),
            "top-up" => Ok(BatchFill::TopUp),
            other => Err(Error::invalid_config(format!(
                "unknown batch_fill '{}', expected \"page-aligned\" or \"top-up\"",
                other
            ))),
        }
    }
}

/// Result of [`PageConsumptionTracker::consume_next`]
#[derive(Debug, Clone, PartialEq)]
pub struct Consumption {
    /// Cards to hand to the UI, at most the requested count
    pub batch: Vec<Card>,
    /// The current page is used up; fetch the next one and `initialize` it
    pub needs_new_remote_page: bool,
}

/// Serves display batches out of one remote page at a time
#[derive(Debug, Clone)]
pub struct PageConsumptionTracker {
    display_batch_size: usize,
    page: Option<RemotePage>,
    consumed: usize,
}

impl PageConsumptionTracker {
    /// Empty tracker; `initialize` must be called with the first page
    pub fn new(display_batch_size: usize) -> Self {
        PageConsumptionTracker {
            display_batch_size,
            page: None,
            consumed: 0,
        }
    }

    /// Take ownership of a freshly fetched page and return its first batch
    pub fn initialize(&mut self, page: RemotePage) -> Vec<Card> {
        let take = self.display_batch_size;
        self.initialize_partial(page, take)
    }

    /// Like [`initialize`](Self::initialize) but the first batch holds at
    /// most `take` cards
    ///
    /// Used to top up a short batch that ran off the end of the previous page.
    pub fn initialize_partial(&mut self, page: RemotePage, take: usize) -> Vec<Card> {
        let take = take.min(page.cards.len());
        let batch = page.cards[..take].to_vec();
        trace!(
            target: "cardscroll::pagination",
            page = page.page_number,
            page_len = page.cards.len(),
            take,
            "Initialized remote page"
        );
        self.consumed = take;
        self.page = Some(page);
        batch
    }

    /// Serve up to `count` more cards from the current page
    pub fn consume_next(&mut self, count: usize) -> Consumption {
        let page = match &self.page {
            Some(page) => page,
            None => {
                return Consumption {
                    batch: Vec::new(),
                    needs_new_remote_page: true,
                }
            }
        };

        let remaining = page.cards.len() - self.consumed;
        if remaining == 0 {
            return Consumption {
                batch: Vec::new(),
                needs_new_remote_page: true,
            };
        }

        let take = remaining.min(count);
        let batch = page.cards[self.consumed..self.consumed + take].to_vec();
        self.consumed += take;
        trace!(
            target: "cardscroll::pagination",
            page = page.page_number,
            take,
            consumed = self.consumed,
            "Served batch from current page"
        );

        Consumption {
            batch,
            needs_new_remote_page: false,
        }
    }

    /// Page number to fetch once the current page is used up
    ///
    /// # Errors
    ///
    /// `Exhausted` when the current page said nothing more is available.
    pub fn next_page_number(&self) -> Result<u32> {
        match &self.page {
            None => Ok(1),
            Some(page) if page.has_more => Ok(page.page_number + 1),
            Some(page) => Err(Error::Exhausted {
                page: page.page_number,
            }),
        }
    }

    /// Cards of the current page not yet handed out
    pub fn remaining(&self) -> usize {
        self.page
            .as_ref()
            .map_or(0, |page| page.cards.len() - self.consumed)
    }

    /// Cards of the current page already handed out
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Whether anything is left, on this page or a later one
    pub fn has_more(&self) -> bool {
        match &self.page {
            None => false,
            Some(page) => self.remaining() > 0 || page.has_more,
        }
    }

    /// The page being consumed
    pub fn current_page(&self) -> Option<&RemotePage> {
        self.page.as_ref()
    }

    /// Page number of the page being consumed, 0 before the first page
    pub fn current_page_number(&self) -> u32 {
        self.page.as_ref().map_or(0, |page| page.page_number)
    }

    /// Batch size used by `initialize`
    pub fn display_batch_size(&self) -> usize {
        self.display_batch_size
    }

    /// Forget the current page
    pub fn reset(&mut self) {
        self.page = None;
        self.consumed = 0;
    }
}
