use std::{sync::Mutex, time::Duration};

use prepwise::application::{
    clipboard::{Clipboard, ClipboardError},
    render::{COPY_INDICATOR_RESET, CodeBlock, CodeBlockRenderer},
};

#[derive(Default)]
struct RecordingClipboard {
    writes: Mutex<Vec<String>>,
}

impl Clipboard for RecordingClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn renderer() -> CodeBlockRenderer {
    CodeBlockRenderer::new(CodeBlock::new(Some("python"), "print(1)"))
}

#[tokio::test(start_paused = true)]
async fn indicator_reverts_after_reset_delay() {
    let clipboard = RecordingClipboard::default();
    let mut renderer = renderer();

    assert!(renderer.copy(&clipboard));
    assert!(renderer.is_copied());
    assert!(renderer.render().contains(">Copied</button>"));

    tokio::time::sleep(COPY_INDICATOR_RESET - Duration::from_millis(1)).await;
    assert!(renderer.is_copied());

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert!(!renderer.is_copied());
    assert!(renderer.render().contains(">Copy</button>"));
    assert_eq!(clipboard.writes.lock().unwrap().as_slice(), ["print(1)"]);
}

#[tokio::test(start_paused = true)]
async fn second_copy_restarts_the_delay() {
    let clipboard = RecordingClipboard::default();
    let mut renderer = renderer();

    renderer.copy(&clipboard);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    renderer.copy(&clipboard);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(renderer.is_copied(), "first revert must have been cancelled");

    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert!(!renderer.is_copied());
    assert_eq!(clipboard.writes.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_copy_and_revert() {
    let clipboard = RecordingClipboard::default();
    let mut renderer = renderer();
    let mut copied = renderer.subscribe_copied();

    renderer.copy(&clipboard);
    copied.changed().await.expect("indicator alive");
    assert!(*copied.borrow_and_update());

    copied.changed().await.expect("indicator alive");
    assert!(!*copied.borrow_and_update());
}
