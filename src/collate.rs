//! Name collation used for display sorting.
//!
//! Names compare under the Chinese stroke-order collation (the zh-TW
//! convention), case-insensitively, with digit runs ordered by numeric
//! value so that seat-number suffixes ("王小明2" vs "王小明10") sort
//! naturally. Ties fall back to plain string order, which keeps the
//! ordering total.

use icu_collator::{Collator, CollatorOptions, Numeric, Strength};
use icu_locid::Locale;
use std::cmp::Ordering;

const COLLATION_LOCALE: &str = "zh-u-co-stroke";

thread_local! {
    static COLLATOR: Option<Collator> = build_collator();
}

fn build_collator() -> Option<Collator> {
    let locale: Locale = match COLLATION_LOCALE.parse() {
        Ok(l) => l,
        Err(e) => {
            log::warn!("bad collation locale {}: {}", COLLATION_LOCALE, e);
            return None;
        }
    };
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Secondary);
    options.numeric = Some(Numeric::On);
    match Collator::try_new(&locale.into(), options) {
        Ok(c) => Some(c),
        Err(e) => {
            log::warn!("collator unavailable, names sort by code point: {}", e);
            None
        }
    }
}

pub fn compare_names(left: &str, right: &str) -> Ordering {
    COLLATOR
        .with(|c| match c {
            Some(c) => c.compare(left, right),
            None => Ordering::Equal,
        })
        .then_with(|| left.cmp(right))
}
