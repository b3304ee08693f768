use std::{sync::Arc, time::Duration};

use tokio::{runtime::Handle, sync::watch, task::AbortHandle};
use tracing::warn;

use crate::application::clipboard::{Clipboard, ClipboardError};

use super::highlight::{CLASS_STYLE, highlight_code, syntax_set};
use super::types::CodeBlock;

/// How long the "copied" indicator stays up after a successful copy.
pub const COPY_INDICATOR_RESET: Duration = Duration::from_secs(2);

const TARGET: &str = "prepwise::render::code_block";

/// Self-expiring "copied" flag backed by a single-slot revert timer.
///
/// Marking the indicator again before it expires replaces the pending revert,
/// so only one reversion is ever outstanding.
pub struct CopyIndicator {
    state: Arc<watch::Sender<bool>>,
    revert: Option<AbortHandle>,
    reset_after: Duration,
}

impl CopyIndicator {
    pub fn new(reset_after: Duration) -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
            revert: None,
            reset_after,
        }
    }

    pub fn is_copied(&self) -> bool {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Raise the flag and (re)start the revert delay. Outside a tokio runtime
    /// no revert can be armed, so the flag stays down and `false` is returned.
    pub fn mark(&mut self) -> bool {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!(target = TARGET, error = %err, "no runtime for copy indicator");
                return false;
            }
        };
        self.cancel_revert();

        let state = Arc::clone(&self.state);
        let delay = self.reset_after;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            state.send_replace(false);
        });
        self.revert = Some(handle.abort_handle());
        self.state.send_replace(true);
        true
    }

    fn cancel_revert(&mut self) {
        if let Some(previous) = self.revert.take() {
            previous.abort();
        }
    }
}

impl Default for CopyIndicator {
    fn default() -> Self {
        Self::new(COPY_INDICATOR_RESET)
    }
}

impl Drop for CopyIndicator {
    fn drop(&mut self) {
        self.cancel_revert();
    }
}

/// Renders one fenced code block and owns its copy affordance.
pub struct CodeBlockRenderer {
    block: CodeBlock,
    indicator: CopyIndicator,
}

impl CodeBlockRenderer {
    pub fn new(block: CodeBlock) -> Self {
        Self::with_indicator(block, CopyIndicator::default())
    }

    pub fn with_indicator(block: CodeBlock, indicator: CopyIndicator) -> Self {
        Self { block, indicator }
    }

    pub fn block(&self) -> &CodeBlock {
        &self.block
    }

    pub fn is_copied(&self) -> bool {
        self.indicator.is_copied()
    }

    pub fn subscribe_copied(&self) -> watch::Receiver<bool> {
        self.indicator.subscribe()
    }

    /// Highlighted markup for the block. Unknown languages and highlighter
    /// failures degrade to escaped monospace text.
    pub fn render(&self) -> String {
        let language = self
            .block
            .language
            .as_deref()
            .filter(|lang| !language_class(lang).is_empty());
        let highlighted = match highlight_code(
            language,
            &self.block.text,
            syntax_set(),
            CLASS_STYLE,
        ) {
            Ok(html) => html,
            Err(err) => {
                warn!(target = TARGET, error = %err, "falling back to plain code block");
                None
            }
        };

        let button = self.copy_button();
        match (highlighted, language.map(language_class)) {
            (Some(html), Some(lang)) => format!(
                "<div class=\"code-block\" data-role=\"code-block\">{button}\
                 <pre class=\"syntax-highlight syntax-lang-{lang}\" data-language=\"{lang}\">\
                 <code class=\"language-{lang} syntax-code\">{html}</code></pre></div>"
            ),
            _ => format!(
                "<div class=\"code-block\" data-role=\"code-block\">{button}\
                 <pre class=\"syntax-plain\"><code>{}</code></pre></div>",
                ammonia::clean_text(&self.block.text)
            ),
        }
    }

    /// Copy the code text verbatim. Returns whether the clipboard accepted it;
    /// failures are logged and leave the indicator untouched.
    pub fn copy(&mut self, clipboard: &dyn Clipboard) -> bool {
        match self.try_copy(clipboard) {
            Ok(()) => true,
            Err(err) => {
                warn!(target = TARGET, error = %err, "clipboard write failed");
                false
            }
        }
    }

    /// Like [`copy`](Self::copy) but hands the clipboard error to the caller.
    pub fn try_copy(&mut self, clipboard: &dyn Clipboard) -> Result<(), ClipboardError> {
        clipboard.write_text(&self.block.text)?;
        self.indicator.mark();
        Ok(())
    }

    fn copy_button(&self) -> String {
        let (label, copied) = if self.is_copied() {
            ("Copied", "true")
        } else {
            ("Copy", "false")
        };
        format!(
            "<button type=\"button\" class=\"code-copy-button\" data-role=\"code-copy-button\" \
             data-copied=\"{copied}\" aria-label=\"Copy code\">{label}</button>"
        )
    }
}

/// Reduce an untrusted fence language to a safe class/attribute token.
fn language_class(language: &str) -> String {
    language
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '+' | '#'))
        .collect::<String>()
        .to_ascii_lowercase()
}
