use std::collections::HashMap;
use std::sync::Arc;

use narra_book::{PageDimensions, Story, StoryId};

use crate::render_ir::PaginationProfileId;
use crate::render_layout::{Paginator, StoryLayoutFlags, StoryPagination};

/// Per-story pagination cache.
///
/// Entries are keyed by story id and validated by a fingerprint of the story
/// text, title, page geometry and paginator flags, so editing one story only
/// invalidates that story. A cache is tied to one text measurer.
#[derive(Clone, Debug, Default)]
pub struct PaginationCache {
    entries: HashMap<StoryId, CacheEntry>,
    hits: usize,
    misses: usize,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    key: PaginationProfileId,
    pagination: Arc<StoryPagination>,
}

impl PaginationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint of everything that affects a story's pagination.
    pub fn story_key(
        story: &Story,
        dims: &PageDimensions,
        flags: StoryLayoutFlags,
    ) -> PaginationProfileId {
        let mut payload = dims.fingerprint_bytes();
        payload.push(u8::from(flags.reserve_title));
        payload.push(u8::from(flags.drop_cap));
        payload.extend_from_slice(story.display_title().as_bytes());
        payload.push(0);
        payload.extend_from_slice(story.content.as_bytes());
        PaginationProfileId::from_bytes(&payload)
    }

    /// Cached pagination for `story_id` if its fingerprint still matches.
    pub fn get(&mut self, story_id: &str, key: PaginationProfileId) -> Option<Arc<StoryPagination>> {
        match self.entries.get(story_id) {
            Some(entry) if entry.key == key => {
                self.hits += 1;
                Some(Arc::clone(&entry.pagination))
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(
        &mut self,
        story_id: impl Into<StoryId>,
        key: PaginationProfileId,
        pagination: Arc<StoryPagination>,
    ) {
        self.entries
            .insert(story_id.into(), CacheEntry { key, pagination });
    }

    /// Return the cached pagination or paginate and store it.
    ///
    /// The flag reports whether the entry was reused.
    pub fn get_or_paginate(
        &mut self,
        story: &Story,
        paginator: &Paginator,
        flags: StoryLayoutFlags,
    ) -> (Arc<StoryPagination>, bool) {
        let key = Self::story_key(story, paginator.dimensions(), flags);
        if let Some(hit) = self.get(&story.id, key) {
            return (hit, true);
        }
        let pagination = Arc::new(paginator.paginate(&story.content, flags));
        self.insert(story.id.clone(), key, Arc::clone(&pagination));
        (pagination, false)
    }

    /// Drop the entry for `story_id`. Returns whether one existed.
    pub fn invalidate(&mut self, story_id: &str) -> bool {
        self.entries.remove(story_id).is_some()
    }

    /// Drop entries for stories no longer in the book.
    pub fn retain_stories<'a, I>(&mut self, story_ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keep: std::collections::HashSet<&str> = story_ids.into_iter().collect();
        self.entries.retain(|id, _| keep.contains(id.as_str()));
    }

    pub fn contains(&self, story_id: &str) -> bool {
        self.entries.contains_key(story_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> StoryLayoutFlags {
        StoryLayoutFlags {
            reserve_title: true,
            drop_cap: false,
        }
    }

    #[test]
    fn second_lookup_hits() {
        let paginator = Paginator::new(PageDimensions::default());
        let story = Story::new("s1", Some("Title"), "One.\nTwo.");
        let mut cache = PaginationCache::new();
        let (first, hit) = cache.get_or_paginate(&story, &paginator, flags());
        assert!(!hit);
        let (second, hit) = cache.get_or_paginate(&story, &paginator, flags());
        assert!(hit);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn edited_content_misses_only_for_that_story() {
        let paginator = Paginator::new(PageDimensions::default());
        let a = Story::new("a", None, "Alpha.");
        let mut b = Story::new("b", None, "Beta.");
        let mut cache = PaginationCache::new();
        cache.get_or_paginate(&a, &paginator, flags());
        cache.get_or_paginate(&b, &paginator, flags());

        b.content.push_str("\nMore beta.");
        assert!(cache.get_or_paginate(&a, &paginator, flags()).1);
        assert!(!cache.get_or_paginate(&b, &paginator, flags()).1);
    }

    #[test]
    fn geometry_change_changes_key() {
        let story = Story::new("s", None, "x");
        let a = PaginationCache::story_key(&story, &PageDimensions::default(), flags());
        let dims = PageDimensions {
            margin_px: 40.0,
            ..PageDimensions::default()
        };
        assert_ne!(a, PaginationCache::story_key(&story, &dims, flags()));
    }

    #[test]
    fn retain_drops_removed_stories() {
        let paginator = Paginator::new(PageDimensions::default());
        let mut cache = PaginationCache::new();
        for id in ["a", "b", "c"] {
            cache.get_or_paginate(&Story::new(id, None, "x"), &paginator, flags());
        }
        cache.retain_stories(["a", "c"]);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("b"));
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
    }
}
