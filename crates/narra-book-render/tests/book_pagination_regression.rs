use std::sync::Arc;

use narra_book::{BookConfig, BookSnapshot, CoverData, MediaItem, PageDimensions, Story};
use narra_book_render::{
    BookLayout, BookRenderer, DrawCommand, Page, PaginationCache, RenderPage, TextRole,
};

const SENTENCE: &str = "My grandmother kept a small notebook in the pocket of her apron and wrote down \
the weather, the price of eggs, and the names of every visitor who came up the lane.";

fn long_story(id: &str, paragraphs: usize) -> Story {
    let content = (0..paragraphs)
        .map(|i| format!("Paragraph {i}. {SENTENCE} {SENTENCE}"))
        .collect::<Vec<_>>()
        .join("\n");
    Story::new(id, Some("The Lane"), content)
}

fn media(id: &str, story: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        story_id: story.to_string(),
        file_path: format!("photos/{id}.jpg"),
        content_type: "image/jpeg".to_string(),
        caption: None,
        created_at: Default::default(),
    }
}

fn build(stories: Vec<Story>, media: Vec<MediaItem>, config: &BookConfig) -> BookRenderer {
    let snapshot = Arc::new(BookSnapshot::new(
        "Family Book",
        "Rose",
        stories,
        media,
        CoverData::default(),
    ));
    let layout = BookLayout::build(snapshot, config).expect("layout");
    BookRenderer::new(Arc::new(layout))
}

fn story_words(renderer: &BookRenderer, story_id: &str) -> Vec<String> {
    let mut text = String::new();
    for (idx, page) in renderer.layout().pages().iter().enumerate() {
        if !matches!(page, Page::Text { story_id: id, .. } if id == story_id) {
            continue;
        }
        let rendered = renderer.render_page(idx).expect("page in range");
        for cmd in rendered.text_commands() {
            match cmd.style.role {
                // The drop cap letter is glued to the first body line.
                TextRole::DropCap => text.push_str(&cmd.text),
                TextRole::Body => {
                    text.push_str(&cmd.text);
                    text.push(' ');
                }
                _ => {}
            }
        }
    }
    text.split_whitespace().map(str::to_string).collect()
}

#[test]
fn long_story_text_appears_exactly_once_in_order() {
    let story = long_story("s1", 30);
    let expected: Vec<String> = story.content.split_whitespace().map(str::to_string).collect();
    let renderer = build(vec![story], vec![], &BookConfig::default());
    let text_pages = renderer
        .layout()
        .pages()
        .iter()
        .filter(|p| matches!(p, Page::Text { .. }))
        .count();
    assert!(text_pages > 2, "expected a multi-page story, got {text_pages}");
    assert_eq!(story_words(&renderer, "s1"), expected);
}

#[test]
fn oversized_paragraph_is_split_without_losing_lines() {
    let huge = vec![SENTENCE; 40].join(" ");
    let story = Story::new("s1", Some("Huge"), format!("Short opening.\n{huge}\nClosing line."));
    let expected: Vec<String> = story.content.split_whitespace().map(str::to_string).collect();
    let renderer = build(vec![story], vec![], &BookConfig::default());
    let pagination = renderer.layout().pagination("s1").expect("paginated");
    assert!(pagination.page_count() >= 3);
    let spanning = pagination
        .pages
        .iter()
        .filter(|page| page.slices.iter().any(|slice| slice.paragraph == 1))
        .count();
    assert!(spanning >= 2);
    assert_eq!(story_words(&renderer, "s1"), expected);
}

#[test]
fn body_text_stays_inside_the_content_box() {
    let dims = PageDimensions::default();
    let renderer = build(
        vec![long_story("a", 12), long_story("b", 5)],
        vec![media("m1", "a")],
        &BookConfig::default(),
    );
    let right = dims.content_left() + dims.content_width() + 0.01;
    for page in renderer.pages() {
        for cmd in page.text_commands() {
            if cmd.style.role != TextRole::Body {
                continue;
            }
            assert!(cmd.x >= dims.content_left() - 0.01);
            assert!(cmd.x + cmd.width <= right, "line overflows: {:?}", cmd.text);
            assert!(cmd.baseline_y <= dims.content_bottom());
            assert!(cmd.baseline_y > dims.content_top());
        }
    }
}

#[test]
fn footer_numbers_match_global_page_positions() {
    let renderer = build(
        vec![long_story("a", 8), long_story("b", 3)],
        vec![media("m1", "b"), media("m2", "b")],
        &BookConfig::print(),
    );
    let pages: Vec<RenderPage> = renderer.pages().collect();
    assert_eq!(pages.len(), renderer.layout().total_page_count());
    for (idx, page) in pages.iter().enumerate().skip(1) {
        let numbers = page.texts_with_role(TextRole::PageNumber);
        if renderer.layout().pages()[idx].is_content_page() {
            assert_eq!(numbers, vec![(idx + 1).to_string().as_str()]);
        }
    }
    let b_start = renderer.layout().story_start_page("b").expect("laid out");
    let toc_numbers = pages[1].texts_with_role(TextRole::ContentsEntry);
    assert!(toc_numbers.contains(&(b_start + 1).to_string().as_str()));
}

#[test]
fn media_pages_follow_story_text() {
    let renderer = build(
        vec![long_story("a", 2)],
        vec![media("m1", "a"), media("m2", "a")],
        &BookConfig::default(),
    );
    let last = renderer.page_count() - 1;
    for idx in [last - 1, last] {
        let page = renderer.render_page(idx).expect("page");
        assert!(page
            .content_commands
            .iter()
            .any(|cmd| matches!(cmd, DrawCommand::ImageObject(img) if img.src.starts_with("photos/"))));
    }
}

#[test]
fn editing_one_story_keeps_the_others_cached() {
    let config = BookConfig::default();
    let mut cache = PaginationCache::new();
    let stories = vec![long_story("a", 6), long_story("b", 6)];
    let snapshot = Arc::new(BookSnapshot::new("Book", "", stories.clone(), Vec::new(), CoverData::default()));
    let first = BookLayout::build_with_cache(snapshot, &config, &mut cache).expect("layout");

    let mut edited = stories;
    edited[1].content.push_str("\nOne more memory.");
    let snapshot = Arc::new(BookSnapshot::new("Book", "", edited, Vec::new(), CoverData::default()));
    let second = BookLayout::build_with_cache(snapshot, &config, &mut cache).expect("layout");

    assert_eq!(cache.hits(), 1);
    assert_eq!(first.story_start_page("b"), second.story_start_page("b"));
    assert_ne!(first.profile(), second.profile());
}

#[test]
fn page_index_serializes_for_clients() {
    let renderer = build(vec![long_story("a", 2)], vec![media("m1", "a")], &BookConfig::print());
    let json = serde_json::to_value(renderer.layout().pages()).expect("serialize pages");
    let pages = json.as_array().expect("array");
    assert_eq!(pages.len(), renderer.page_count());
    assert_eq!(pages[0], serde_json::json!("Cover"));
    assert_eq!(pages[2]["StoryTitle"]["story_id"], "a");
    assert_eq!(pages.last().expect("media page")["Media"]["media_id"], "m1");
}
