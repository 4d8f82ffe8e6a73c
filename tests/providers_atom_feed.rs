// tests/providers_atom_feed.rs
use subreddit_proxy::error::FetchError;
use subreddit_proxy::fetch::providers::atom_feed::parse_feed;

const ATOM_XML: &str = include_str!("fixtures/subreddit_atom.xml");

#[test]
fn fixture_feed_yields_both_entries_with_decoded_titles() {
    let posts = parse_feed(ATOM_XML, "coffee").expect("feed should parse");

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "Espresso & grinder dial-in diary");
    assert_eq!(posts[1].title, "Sunrise pour at the lake this morning");
}

#[test]
fn two_minimal_entries_decode_entities() {
    let body = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><title>A &amp; B</title></entry>
  <entry><title>C</title></entry>
</feed>"#;
    let posts = parse_feed(body, "test").expect("feed should parse");
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "A & B");
    assert_eq!(posts[1].title, "C");
}

#[test]
fn score_and_comment_counts_come_from_content_text() {
    let posts = parse_feed(ATOM_XML, "coffee").expect("feed should parse");

    assert_eq!(posts[0].score, 431);
    assert_eq!(posts[0].upvotes, 431);
    assert_eq!(posts[0].comments, 87);
    assert_eq!(posts[1].score, 1204);
    assert_eq!(posts[1].comments, 43);
}

#[test]
fn counts_default_to_zero_when_content_is_silent() {
    let body = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><title>quiet</title><content type="html">no numbers here</content></entry>
</feed>"#;
    let posts = parse_feed(body, "test").expect("feed should parse");
    assert_eq!(posts[0].score, 0);
    assert_eq!(posts[0].comments, 0);
}

#[test]
fn ids_derive_from_the_comments_link() {
    let posts = parse_feed(ATOM_XML, "coffee").expect("feed should parse");
    assert_eq!(posts[0].id, "1c0ffee2");
    assert_eq!(posts[1].id, "1c0ffee3");
}

#[test]
fn linkless_entries_get_a_synthesized_id() {
    let body = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><title>floating</title></entry>
</feed>"#;
    let posts = parse_feed(body, "test").expect("feed should parse");
    assert!(posts[0].id.starts_with("feed"));
    assert!(posts[0].permalink.starts_with("/r/test/comments/"));
}

#[test]
fn author_prefix_is_stripped_and_timestamps_parsed() {
    let posts = parse_feed(ATOM_XML, "coffee").expect("feed should parse");

    assert_eq!(posts[0].author, "grind_theory");
    assert_eq!(posts[1].author, "camp_brewer");
    assert!(posts[0].created > 0.0);
    assert!(posts[0].created > posts[1].created, "fixture order is newest first");
}

#[test]
fn feed_only_fields_are_explicitly_null() {
    let posts = parse_feed(ATOM_XML, "coffee").expect("feed should parse");
    for p in &posts {
        assert_eq!(p.selftext, None);
        assert_eq!(p.thumbnail, None);
        assert_eq!(p.flair, None);
        assert_eq!(p.ratio, None);
        assert!(!p.is_nsfw);
        assert!(!p.is_pinned);
    }
}

#[test]
fn permalink_is_site_relative() {
    let posts = parse_feed(ATOM_XML, "coffee").expect("feed should parse");
    assert_eq!(
        posts[0].permalink,
        "/r/coffee/comments/1c0ffee2/dialing_in_a_new_grinder/"
    );
    assert!(posts[0].url.starts_with("https://"));
}

#[test]
fn html_error_page_is_a_failed_attempt_not_an_empty_feed() {
    let err = parse_feed(
        "<html><head><title>Too Many Requests</title></head></html>",
        "coffee",
    )
    .expect_err("must fail");
    assert!(matches!(err, FetchError::Blocked(_)));
}
