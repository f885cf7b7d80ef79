use std::sync::Arc;

use narra_book::{BookConfig, BookNavigator, BookSnapshot, InputMap, NavInput};
use narra_book_render::{BookLayout, Page};

const BOOK_JSON: &str = r##"{
  "title": "Summers at the Lake",
  "author": "Ada Whitfield",
  "stories": [
    { "id": "s1", "title": "Arrival", "content": "We came up the gravel road in July." },
    { "id": "s2", "title": "The Boathouse", "content": "Grandpa kept the canoe under a tarp.\nIt leaked a little." }
  ],
  "media": [
    { "id": "m3", "storyId": "s2", "filePath": "photos/c.jpg", "contentType": "image/jpeg", "createdAt": "2024-03-01T09:03:00Z" },
    { "id": "m1", "storyId": "s2", "filePath": "photos/a.jpg", "contentType": "image/jpeg", "createdAt": "2024-03-01T09:01:00Z" },
    { "id": "m2", "storyId": "s2", "filePath": "photos/b.png", "contentType": "image/png", "createdAt": "2024-03-01T09:02:00Z" }
  ],
  "cover": { "backgroundColor": "#1e3a5f", "titleSize": "22", "layout": "top" }
}"##;

fn layout(config: &BookConfig) -> BookLayout {
    let snapshot = BookSnapshot::from_json_str(BOOK_JSON).expect("book json");
    BookLayout::build(Arc::new(snapshot), config).expect("layout")
}

#[test]
fn cover_text_falls_back_to_book_metadata() {
    let snapshot = BookSnapshot::from_json_str(BOOK_JSON).expect("book json");
    assert_eq!(snapshot.cover.title_text, "Summers at the Lake");
    assert_eq!(snapshot.cover.author_text, "Ada Whitfield");
    assert_eq!(snapshot.cover.title_size, 22.0);
}

#[test]
fn preview_sequence_places_media_after_text() {
    let layout = layout(&BookConfig::default());
    // cover, s1 text, s2 text, m1, m2, m3
    assert_eq!(layout.total_page_count(), 6);
    assert_eq!(layout.story_start_page("s1"), Some(1));
    assert_eq!(layout.story_start_page("s2"), Some(2));
    let media: Vec<&str> = layout
        .pages()
        .iter()
        .filter_map(|page| match page {
            Page::Media { media_id, .. } => Some(media_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(media, vec!["m1", "m2", "m3"]);
    assert!(matches!(layout.page(3), Some(Page::Media { media_id, .. }) if media_id == "m1"));
    assert!(matches!(layout.page(5), Some(Page::Media { media_id, .. }) if media_id == "m3"));
    assert!(layout.page(6).is_none());
}

#[test]
fn print_sequence_adds_contents_and_title_pages() {
    let layout = layout(&BookConfig::print());
    assert!(matches!(layout.page(0), Some(Page::Cover)));
    assert!(matches!(layout.page(1), Some(Page::TableOfContents { .. })));
    assert!(matches!(layout.page(2), Some(Page::StoryTitle { story_id }) if story_id == "s1"));
    // cover, contents, (title, text) x2, three media pages
    assert_eq!(layout.total_page_count(), 9);
    let toc = layout.toc_entries();
    assert_eq!(toc.len(), 2);
    assert_eq!(toc[0].page, 2);
    assert_eq!(toc[1].page, 4);
    assert_eq!(toc[1].end_page, 9);
}

#[test]
fn navigator_follows_layout_and_survives_relayout() {
    let print = layout(&BookConfig::print());
    let mut nav = BookNavigator::new(print.total_page_count());
    let input = InputMap::default();

    assert!(!nav.handle(&input, NavInput::SwipeRight));
    assert!(nav.go_to_page(print.toc_entries()[1].page));
    nav.handle(&input, NavInput::BookmarkKey);
    assert!(nav.handle(&input, NavInput::End));
    nav.handle(&input, NavInput::BookmarkKey);
    assert_eq!(nav.bookmarks().collect::<Vec<_>>(), vec![4, 8]);

    let rows = nav.highlight(print.toc_entries());
    assert!(!rows[0].bookmarked);
    assert!(rows[1].bookmarked);
    assert!(rows[1].current);

    let preview = layout(&BookConfig::default());
    nav.sync_page_count(preview.total_page_count());
    assert_eq!(nav.current(), preview.total_page_count() - 1);
    assert_eq!(nav.bookmarks().collect::<Vec<_>>(), vec![4]);
    assert!(!nav.go_to_page(preview.total_page_count()));
}
