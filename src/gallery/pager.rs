//! Page arithmetic: page counts, navigation and what a page shows.

use crate::gallery::search::ImageRef;
use crate::gallery::views::{NEXT_TOKEN, PREV_TOKEN};

/// Navigation action carried by an inline button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Prev,
    Next,
}

impl Navigation {
    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            PREV_TOKEN => Some(Self::Prev),
            NEXT_TOKEN => Some(Self::Next),
            _ => None,
        }
    }

    pub fn callback_data(self) -> &'static str {
        match self {
            Self::Prev => PREV_TOKEN,
            Self::Next => NEXT_TOKEN,
        }
    }

    /// Target page. Prev never goes below 1; Next is not clamped to the
    /// page count, the controls already hide it on the last page.
    pub fn apply(self, current_page: u32) -> u32 {
        match self {
            Self::Prev => current_page.saturating_sub(1).max(1),
            Self::Next => current_page.saturating_add(1),
        }
    }
}

/// `ceil(total_hits / page_size)`.
pub fn total_pages(total_hits: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_hits.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Which buttons go under a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub prev: bool,
    pub next: bool,
}

impl Controls {
    pub fn for_page(page: u32, total_pages: u32) -> Self {
        Self {
            prev: page > 1,
            next: page < total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.prev && !self.next
    }
}

/// Image urls for one page of a provider result.
///
/// The provider is queried with `per_page = page_size`, so a fetched page
/// is exactly one display page and is shown from its first item. Hits
/// without a url are skipped.
pub fn page_media(items: &[ImageRef], page_size: u32) -> Vec<String> {
    items
        .iter()
        .take(page_size as usize)
        .filter_map(|item| item.url.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(urls: &[Option<&str>]) -> Vec<ImageRef> {
        urls.iter()
            .map(|u| ImageRef { url: u.map(str::to_string) })
            .collect()
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 5), 0);
        assert_eq!(total_pages(1, 5), 1);
        assert_eq!(total_pages(5, 5), 1);
        assert_eq!(total_pages(12, 5), 3);
        assert_eq!(total_pages(500, 5), 100);
    }

    #[test]
    fn test_total_pages_saturates() {
        assert_eq!(total_pages(u64::MAX, 3), u32::MAX);
        assert_eq!(total_pages(10, 0), 0);
    }

    #[test]
    fn test_prev_never_below_one() {
        assert_eq!(Navigation::Prev.apply(1), 1);
        assert_eq!(Navigation::Prev.apply(2), 1);
        assert_eq!(Navigation::Prev.apply(7), 6);
    }

    #[test]
    fn test_next_unclamped() {
        assert_eq!(Navigation::Next.apply(1), 2);
        assert_eq!(Navigation::Next.apply(3), 4);
    }

    #[test]
    fn test_random_walk_stays_positive() {
        let mut page = 1;
        for nav in [
            Navigation::Prev,
            Navigation::Next,
            Navigation::Prev,
            Navigation::Prev,
            Navigation::Next,
            Navigation::Next,
            Navigation::Prev,
        ] {
            page = nav.apply(page);
            assert!(page >= 1);
        }
        assert_eq!(page, 2);
    }

    #[test]
    fn test_callback_tokens() {
        assert_eq!(Navigation::from_callback_data("<"), Some(Navigation::Prev));
        assert_eq!(Navigation::from_callback_data(">"), Some(Navigation::Next));
        assert_eq!(Navigation::from_callback_data("x"), None);
        for nav in [Navigation::Prev, Navigation::Next] {
            assert_eq!(Navigation::from_callback_data(nav.callback_data()), Some(nav));
        }
    }

    #[test]
    fn test_controls() {
        assert_eq!(Controls::for_page(1, 3), Controls { prev: false, next: true });
        assert_eq!(Controls::for_page(2, 3), Controls { prev: true, next: true });
        assert_eq!(Controls::for_page(3, 3), Controls { prev: true, next: false });
        assert!(Controls::for_page(1, 1).is_empty());
        assert_eq!(Controls::for_page(4, 3), Controls { prev: true, next: false });
    }

    #[test]
    fn test_page_media_starts_at_first_item() {
        let items = refs(&[Some("a"), Some("b"), Some("c"), Some("d"), Some("e"), Some("f")]);
        assert_eq!(page_media(&items, 5), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_page_media_skips_absent() {
        let items = refs(&[Some("a"), None, Some("c")]);
        assert_eq!(page_media(&items, 5), vec!["a", "c"]);
    }

    #[test]
    fn test_page_media_empty() {
        assert!(page_media(&[], 5).is_empty());
        assert!(page_media(&refs(&[None, None]), 5).is_empty());
    }
}
