//! Page navigation over a laid-out book.
//!
//! The navigator only knows page indices. It is driven by [`NavCommand`]s,
//! which an [`InputMap`] produces from raw gestures and keys, so the paging
//! rules can be tested without any UI.
//!
//! # Usage
//!
//! ```rust
//! use narra_book::navigation::{BookNavigator, InputMap, NavInput};
//!
//! let mut nav = BookNavigator::new(5);
//! let input = InputMap::default();
//! nav.handle(&input, NavInput::SwipeLeft);
//! assert_eq!(nav.current(), 1);
//! nav.handle(&input, NavInput::End);
//! assert_eq!(nav.current(), 4);
//! assert!(!nav.go_to_next_page());
//! ```

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::StoryId;

/// A table-of-contents line: one story and the global pages it spans.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub story_id: StoryId,
    pub title: String,
    /// First global page of the story.
    pub page: usize,
    /// One past the last global page of the story.
    pub end_page: usize,
}

impl TocEntry {
    pub fn contains(&self, page: usize) -> bool {
        (self.page..self.end_page).contains(&page)
    }

    /// 1-based page number printed in the contents list.
    pub fn display_page(&self) -> usize {
        self.page + 1
    }
}

/// A [`TocEntry`] annotated for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocRow<'a> {
    pub entry: &'a TocEntry,
    /// Some bookmarked page falls inside this story.
    pub bookmarked: bool,
    /// The reader is currently inside this story.
    pub current: bool,
}

/// Raw user input the reader UI can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavInput {
    SwipeLeft,
    SwipeRight,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
    Home,
    End,
    BookmarkKey,
}

/// What the navigator should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavCommand {
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    GoTo(usize),
    ToggleBookmark,
}

/// Lookup table from input to command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputMap {
    bindings: HashMap<NavInput, NavCommand>,
}

impl InputMap {
    /// A map with no bindings.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind `input` to `command`, returning the previous binding.
    pub fn bind(&mut self, input: NavInput, command: NavCommand) -> Option<NavCommand> {
        self.bindings.insert(input, command)
    }

    pub fn unbind(&mut self, input: NavInput) -> Option<NavCommand> {
        self.bindings.remove(&input)
    }

    pub fn command_for(&self, input: NavInput) -> Option<NavCommand> {
        self.bindings.get(&input).copied()
    }
}

impl Default for InputMap {
    /// Swiping left turns the page forward, like paper.
    fn default() -> Self {
        let mut map = Self::empty();
        map.bind(NavInput::SwipeLeft, NavCommand::NextPage);
        map.bind(NavInput::SwipeRight, NavCommand::PrevPage);
        map.bind(NavInput::ArrowRight, NavCommand::NextPage);
        map.bind(NavInput::ArrowLeft, NavCommand::PrevPage);
        map.bind(NavInput::PageDown, NavCommand::NextPage);
        map.bind(NavInput::PageUp, NavCommand::PrevPage);
        map.bind(NavInput::Home, NavCommand::FirstPage);
        map.bind(NavInput::End, NavCommand::LastPage);
        map.bind(NavInput::BookmarkKey, NavCommand::ToggleBookmark);
        map
    }
}

/// Reader position and bookmarks over `page_count` pages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookNavigator {
    current: usize,
    page_count: usize,
    bookmarks: BTreeSet<usize>,
}

impl BookNavigator {
    pub fn new(page_count: usize) -> Self {
        Self {
            current: 0,
            page_count,
            bookmarks: BTreeSet::new(),
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Jump to `page`. Returns `false` (and stays put) when out of range.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page >= self.page_count {
            log::debug!(
                "rejecting jump to page {page}; book has {} pages",
                self.page_count
            );
            return false;
        }
        let moved = page != self.current;
        self.current = page;
        moved
    }

    /// Advance one page; no-op on the last page.
    pub fn go_to_next_page(&mut self) -> bool {
        if self.current + 1 >= self.page_count {
            return false;
        }
        self.current += 1;
        true
    }

    /// Go back one page; no-op on page 0.
    pub fn go_to_prev_page(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn go_to_first_page(&mut self) -> bool {
        self.go_to_page(0)
    }

    pub fn go_to_last_page(&mut self) -> bool {
        match self.page_count.checked_sub(1) {
            Some(last) => self.go_to_page(last),
            None => false,
        }
    }

    /// Toggle a bookmark on the current page. Returns the new state.
    pub fn toggle_bookmark(&mut self) -> bool {
        self.toggle_bookmark_at(self.current)
    }

    /// Toggle a bookmark on `page`. Out-of-range pages are never bookmarked.
    pub fn toggle_bookmark_at(&mut self, page: usize) -> bool {
        if page >= self.page_count {
            return false;
        }
        if self.bookmarks.remove(&page) {
            false
        } else {
            self.bookmarks.insert(page);
            true
        }
    }

    pub fn is_bookmarked(&self, page: usize) -> bool {
        self.bookmarks.contains(&page)
    }

    /// Bookmarked pages, ascending.
    pub fn bookmarks(&self) -> impl Iterator<Item = usize> + '_ {
        self.bookmarks.iter().copied()
    }

    /// Adopt a new page count after relayout.
    ///
    /// The current page is clamped to the last page and bookmarks past the
    /// end are dropped.
    pub fn sync_page_count(&mut self, page_count: usize) {
        self.page_count = page_count;
        self.current = self.current.min(page_count.saturating_sub(1));
        self.bookmarks.retain(|page| *page < page_count);
    }

    /// Execute a command. Returns whether navigator state changed.
    pub fn apply(&mut self, command: NavCommand) -> bool {
        match command {
            NavCommand::NextPage => self.go_to_next_page(),
            NavCommand::PrevPage => self.go_to_prev_page(),
            NavCommand::FirstPage => self.go_to_first_page(),
            NavCommand::LastPage => self.go_to_last_page(),
            NavCommand::GoTo(page) => self.go_to_page(page),
            NavCommand::ToggleBookmark => {
                if self.page_count == 0 {
                    return false;
                }
                self.toggle_bookmark();
                true
            }
        }
    }

    /// Translate `input` through `map` and apply it. Unbound input is ignored.
    pub fn handle(&mut self, map: &InputMap, input: NavInput) -> bool {
        map.command_for(input)
            .map(|command| self.apply(command))
            .unwrap_or(false)
    }

    /// Annotate contents entries with bookmark and position state.
    pub fn highlight<'a>(&self, entries: &'a [TocEntry]) -> Vec<TocRow<'a>> {
        entries
            .iter()
            .map(|entry| TocRow {
                entry,
                bookmarked: self
                    .bookmarks
                    .range(entry.page..entry.end_page.max(entry.page))
                    .next()
                    .is_some(),
                current: entry.contains(self.current),
            })
            .collect()
    }
}
