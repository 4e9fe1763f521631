//! Typewriter effect cycling through a list of messages.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::{Behavior, BehaviorContext, CancelToken};
use crate::dom::{Document, SharedDocument};

#[derive(Debug, Clone)]
pub struct TypingConfig {
    pub messages: Vec<String>,
    /// Id of the element whose text is typed.
    pub text_id: String,
    /// Id of the cursor element; it carries the `typing` class while typing.
    pub cursor_id: String,
    pub typing_speed: Duration,
    pub deleting_speed: Duration,
    /// Pause with a fully typed message before deleting it.
    pub pause: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            messages: vec![
                "I enjoy making open source software.".to_string(),
                "I enjoy making things from scratch.".to_string(),
                "I enjoy being a software developer.".to_string(),
            ],
            text_id: "typing-text".to_string(),
            cursor_id: "cursor".to_string(),
            typing_speed: Duration::from_millis(100),
            deleting_speed: Duration::from_millis(50),
            pause: Duration::from_millis(6000),
        }
    }
}

const TYPING_CLASS: &str = "typing";

/// Types each message, pauses, deletes it and moves on to the next one.
///
/// Starts from the first message fully displayed, so the first visible change
/// is the deletion after the initial pause.
#[derive(Debug)]
pub struct TypingEffect {
    config: TypingConfig,
    token: Option<CancelToken>,
    task: Option<JoinHandle<()>>,
}

impl TypingEffect {
    pub fn new(config: TypingConfig) -> Self {
        Self {
            config,
            token: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    fn first_message(&self) -> &str {
        self.config.messages.first().map(String::as_str).unwrap_or("")
    }
}

impl Behavior for TypingEffect {
    fn run(&mut self, ctx: &BehaviorContext) {
        if self.is_running() || self.config.messages.is_empty() {
            return;
        }

        let token = CancelToken::new();
        let task = tokio::task::spawn_local(animate(
            ctx.document.clone(),
            self.config.clone(),
            token.clone(),
        ));
        self.token = Some(token);
        self.task = Some(task);
    }

    fn cleanup(&mut self, document: &mut Document) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        restore(document, &self.config, self.first_message());
    }
}

fn restore(document: &mut Document, config: &TypingConfig, text: &str) {
    if let Some(node) = document.get_element_by_id(&config.text_id) {
        document.set_text_content(node, text);
    }
    if let Some(cursor) = document.get_element_by_id(&config.cursor_id) {
        if let Some(el) = document.element_mut(cursor) {
            el.remove_class(TYPING_CLASS);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Typing,
    Deleting,
}

async fn animate(document: SharedDocument, config: TypingConfig, token: CancelToken) {
    let mut message = 0;
    let mut chars = config.messages[0].chars().count();
    let mut phase = Phase::Typing;
    let mut delay = config.typing_speed;

    loop {
        tokio::time::sleep(delay).await;

        let mut doc = document.borrow_mut();
        if token.is_cancelled() {
            restore(&mut doc, &config, &config.messages[0]);
            return;
        }

        let (Some(text), Some(cursor)) = (
            doc.get_element_by_id(&config.text_id),
            doc.get_element_by_id(&config.cursor_id),
        ) else {
            tracing::debug!("Typing targets are gone, stopping");
            return;
        };

        let current = &config.messages[message];
        let length = current.chars().count();
        let mut typing = true;

        match phase {
            Phase::Typing if chars < length => {
                chars += 1;
                delay = config.typing_speed;
            }
            Phase::Typing => {
                typing = false;
                phase = Phase::Deleting;
                delay = config.pause;
            }
            Phase::Deleting if chars > 0 => {
                chars -= 1;
                delay = config.deleting_speed;
            }
            Phase::Deleting => {
                typing = false;
                message = (message + 1) % config.messages.len();
                phase = Phase::Typing;
                delay = config.typing_speed;
            }
        }

        let shown: String = config.messages[message].chars().take(chars).collect();
        doc.set_text_content(text, shown);
        if let Some(el) = doc.element_mut(cursor) {
            if typing {
                el.add_class(TYPING_CLASS);
            } else {
                el.remove_class(TYPING_CLASS);
            }
        }
    }
}
