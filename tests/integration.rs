//! Integration tests for wayfarer's browser layer.
//!
//! These tests require Chrome to be installed and available.
//! Run with: cargo test --test integration -- --ignored

use wayfarer::browser::{BrowserSession, PageDriver};

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn observe_empty_page() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let session = BrowserSession::launch("about:blank", true)
        .await
        .expect("Failed to launch browser");

    let elements = session.observe().await.expect("Failed to observe");
    assert!(elements.is_empty());

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn observe_filters_and_numbers_elements() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    // One visible link, one visible button, one textless input (kept: inputs
    // may legitimately have no text), one empty link (dropped), one
    // zero-size button (dropped), one link far below the viewport (dropped).
    let session = BrowserSession::launch(
        r##"data:text/html,
        <style>body { margin: 0; padding: 20px; }</style>
        <a href="/releases">Releases</a>
        <button>Go</button>
        <input type="text" placeholder="query">
        <a href="/empty"></a>
        <button style="width:0;height:0;padding:0;border:0"></button>
        <a href="/far" style="position:absolute;top:5000px">Far away</a>
    "##,
        true,
    )
    .await
    .expect("Failed to launch browser");

    let elements = session.observe().await.expect("Failed to observe");

    let indices: Vec<usize> = elements.iter().map(|e| e.index).collect();
    assert_eq!(indices, (0..elements.len()).collect::<Vec<_>>());

    let tags: Vec<&str> = elements.iter().map(|e| e.tag.as_str()).collect();
    assert_eq!(tags, vec!["a", "button", "input"]);

    assert_eq!(elements[0].text, "Releases");
    assert_eq!(elements[0].href.as_deref(), Some("/releases"));
    assert_eq!(elements[2].text, "");

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn click_by_index_hits_the_listed_element() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let session = BrowserSession::launch(
        r##"data:text/html,
        <button onclick="document.title='first'">First</button>
        <button onclick="document.title='second'">Second</button>
    "##,
        true,
    )
    .await
    .expect("Failed to launch browser");

    let elements = session.observe().await.expect("Failed to observe");
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[1].text, "Second");

    session.click_index(1).await.expect("Failed to click");

    let title: String = session
        .page()
        .evaluate("document.title")
        .await
        .expect("Failed to read title");
    assert_eq!(title, "second");

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn click_at_reaches_unlisted_elements() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    // A bare div with an onclick handler is outside the extractor's filter
    // set; the coordinate fallback still reaches it.
    let session = BrowserSession::launch(
        r##"data:text/html,
        <style>body { margin: 0; }</style>
        <div onclick="document.title='tapped'"
             style="position:absolute;left:0;top:0;width:200px;height:100px"></div>
    "##,
        true,
    )
    .await
    .expect("Failed to launch browser");

    session.click_at(100, 50).await.expect("Failed to click");

    let title: String = session
        .page()
        .evaluate("document.title")
        .await
        .expect("Failed to read title");
    assert_eq!(title, "tapped");

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn type_into_focused_control() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let session = BrowserSession::launch(
        r##"data:text/html,<input id="q" type="text" autofocus>"##,
        true,
    )
    .await
    .expect("Failed to launch browser");

    session.type_text("rust agents").await.expect("Failed to type");

    let value: String = session
        .page()
        .evaluate("document.getElementById('q').value")
        .await
        .expect("Failed to read value");
    assert_eq!(value, "rust agents");

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn scroll_changes_the_fingerprint() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let session = BrowserSession::launch(
        r##"data:text/html,
        <div style="height:4000px;background:linear-gradient(red,blue)">tall</div>
    "##,
        true,
    )
    .await
    .expect("Failed to launch browser");

    let before = session.snapshot().await.expect("Failed to snapshot");
    session.scroll_down().await.expect("Failed to scroll");
    let after = session.snapshot().await.expect("Failed to snapshot");

    assert_eq!(before.url, after.url);
    assert_ne!(before.fingerprint, after.fingerprint);

    session.close().await.expect("Failed to close browser");
}
