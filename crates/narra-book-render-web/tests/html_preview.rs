use std::sync::Arc;

use narra_book::{BookConfig, BookSnapshot, CoverData, MediaItem, Story};
use narra_book_render::{BookLayout, BookRenderer, MEDIA_PLACEHOLDER_TEXT};
use narra_book_render_web::{render_book_html, HtmlOptions};

fn snapshot() -> Arc<BookSnapshot> {
    let long = (0..40)
        .map(|i| format!("Paragraph {i}: we walked to the river every Sunday after church and counted the boats."))
        .collect::<Vec<_>>()
        .join("\n");
    let stories = vec![
        Story::new("s1", Some("Sundays"), long),
        Story::new("s2", Some("The <Farm> & Barn"), "Short and sweet."),
    ];
    let media = vec![MediaItem {
        id: "m1".to_string(),
        story_id: "s2".to_string(),
        file_path: "photos/barn.jpg".to_string(),
        content_type: "image/jpeg".to_string(),
        caption: Some("The barn, 1958".to_string()),
        created_at: Default::default(),
    }];
    Arc::new(BookSnapshot::new(
        "Family Book",
        "Rose",
        stories,
        media,
        CoverData::default(),
    ))
}

fn renderer(config: &BookConfig) -> BookRenderer {
    let layout = BookLayout::build(snapshot(), config).expect("layout");
    BookRenderer::new(Arc::new(layout))
}

#[test]
fn one_section_per_layout_page() {
    for config in [BookConfig::default(), BookConfig::print()] {
        let renderer = renderer(&config);
        let html = render_book_html(&renderer, &HtmlOptions::default());
        let sections = html.matches("<section class=\"page\"").count();
        assert_eq!(sections, renderer.page_count());
        assert!(html.contains(&format!("\"page_count\":{}", renderer.page_count())));
    }
}

#[test]
fn story_titles_are_escaped() {
    let renderer = renderer(&BookConfig::print());
    let html = render_book_html(&renderer, &HtmlOptions::default());
    assert!(html.contains("The &lt;Farm&gt; &amp; Barn"));
    assert!(!html.contains(">The <Farm>"));
}

#[test]
fn media_pages_carry_a_hidden_placeholder() {
    let renderer = renderer(&BookConfig::default());
    let html = render_book_html(&renderer, &HtmlOptions::default());
    assert!(html.contains("src=\"photos/barn.jpg\""));
    assert!(html.contains(&format!(
        "<span class=\"fallback\" hidden>{MEDIA_PLACEHOLDER_TEXT}</span>"
    )));
}

#[test]
fn navigation_can_be_left_out() {
    let renderer = renderer(&BookConfig::default());
    let html = render_book_html(
        &renderer,
        &HtmlOptions {
            include_navigation: false,
            ..HtmlOptions::default()
        },
    );
    assert!(!html.contains("id=\"narra-book\""));
    assert!(!html.contains("<script>"));
    assert_eq!(
        html.matches("<section class=\"page\"").count(),
        renderer.page_count()
    );
}
