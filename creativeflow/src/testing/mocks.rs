//! Scripted model service for testing.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::canned_reply;
use crate::errors::ModelError;
use crate::model::{FragmentStream, ModelService};
use crate::prompts::Prompt;

/// What a [`ScriptedModel`] does for one call.
#[derive(Debug, Clone)]
pub enum Script {
    /// Reply with this text. Streamed calls yield it word by word.
    Reply(String),
    /// Stream exactly these fragments. Blocking calls get them concatenated.
    Fragments(Vec<String>),
    /// Fail before producing anything.
    Fail(ModelError),
    /// Stream these fragments, then fail. Blocking calls just fail.
    FailAfter(Vec<String>, ModelError),
    /// Never answer.
    Hang,
}

impl Script {
    /// Shorthand for [`Script::Reply`].
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }

    /// Shorthand for a transport failure.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(ModelError::transport(message))
    }
}

fn words(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

/// A [`ModelService`] that answers from per-template scripts.
///
/// Templates without a script get [`canned_reply`]. Every call is recorded so
/// tests can assert which prompts were sent and in what order.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    prompts: Mutex<Vec<Prompt>>,
    call_count: AtomicUsize,
}

impl ScriptedModel {
    /// Creates a model that answers every default template successfully.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the script for every call to `template`.
    #[must_use]
    pub fn with_script(self, template: &str, script: Script) -> Self {
        self.with_sequence(template, vec![script])
    }

    /// Sets successive scripts for `template`. The last one repeats.
    #[must_use]
    pub fn with_sequence(self, template: &str, scripts: Vec<Script>) -> Self {
        self.scripts
            .lock()
            .insert(template.to_string(), scripts.into());
        self
    }

    /// Returns the number of calls made, of either kind.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Returns the template names called, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.prompts.lock().iter().map(|p| p.template.clone()).collect()
    }

    /// Returns every prompt sent for `template`.
    #[must_use]
    pub fn prompts_for(&self, template: &str) -> Vec<Prompt> {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.template == template)
            .cloned()
            .collect()
    }

    fn next_script(&self, prompt: &Prompt) -> Script {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.clone());

        let mut scripts = self.scripts.lock();
        let scripted = scripts.get_mut(&prompt.template).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });
        drop(scripts);

        scripted.unwrap_or_else(|| match canned_reply(&prompt.template) {
            Some(text) => Script::Reply(text),
            None => Script::Fail(ModelError::malformed(format!(
                "no script for template '{}'",
                prompt.template
            ))),
        })
    }
}

#[async_trait]
impl ModelService for ScriptedModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String, ModelError> {
        match self.next_script(prompt) {
            Script::Reply(text) => Ok(text),
            Script::Fragments(fragments) => Ok(fragments.concat()),
            Script::Fail(err) | Script::FailAfter(_, err) => Err(err),
            Script::Hang => futures::future::pending().await,
        }
    }

    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, ModelError> {
        let items: Vec<Result<String, ModelError>> = match self.next_script(prompt) {
            Script::Reply(text) => words(&text).into_iter().map(Ok).collect(),
            Script::Fragments(fragments) => fragments.into_iter().map(Ok).collect(),
            Script::Fail(err) => return Err(err),
            Script::FailAfter(fragments, err) => fragments
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(err)))
                .collect(),
            Script::Hang => return Ok(stream::pending().boxed()),
        };
        Ok(stream::iter(items).boxed())
    }
}
