//! Blocking facade: one transport round trip per operation.
//!
//! `Tracker` pairs a `TrackerClient` with a `Transport`. It keeps no state
//! of its own, so sharing one across threads is as safe as sharing its
//! transport.

use log::debug;

use crate::client::TrackerClient;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::http::{HttpRequest, HttpResponse};
use crate::record::Record;
use crate::story::{apply_state_change, Note, Project, StoryId};
use crate::transport::Transport;

pub struct Tracker<T> {
    client: TrackerClient,
    transport: T,
}

#[cfg(feature = "ureq")]
impl Tracker<crate::transport::UreqTransport> {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config, crate::transport::UreqTransport::new())
    }
}

impl<T: Transport> Tracker<T> {
    pub fn new(config: &TrackerConfig, transport: T) -> Self {
        Self {
            client: TrackerClient::new(config),
            transport,
        }
    }

    pub fn client(&self) -> &TrackerClient {
        &self.client
    }

    pub fn project(&self) -> Result<Project> {
        let response = self.send(self.client.build_project())?;
        self.client.parse_project(response)
    }

    pub fn stories(&self) -> Result<Vec<Record>> {
        let response = self.send(self.client.build_list_stories())?;
        self.client.parse_list_stories(response)
    }

    pub fn find(&self, filters: &[(&str, &str)]) -> Result<Vec<Record>> {
        let response = self.send(self.client.build_find_stories(filters))?;
        self.client.parse_find_stories(response)
    }

    pub fn find_story(&self, id: StoryId) -> Result<Record> {
        let response = self.send(self.client.build_get_story(id))?;
        self.client.parse_get_story(response)
    }

    pub fn create_story(&self, story: &Record) -> Result<Record> {
        let response = self.send(self.client.build_create_story(story)?)?;
        self.client.parse_create_story(response)
    }

    pub fn update_story(&self, story: &Record) -> Result<Record> {
        let response = self.send(self.client.build_update_story(story)?)?;
        self.client.parse_update_story(response)
    }

    /// Delete a story and echo its id.
    pub fn delete_story(&self, id: StoryId) -> Result<StoryId> {
        let response = self.send(self.client.build_delete_story(id))?;
        self.client.parse_delete_story(response)?;
        Ok(id)
    }

    pub fn add_comment(&self, story_id: StoryId, text: &str) -> Result<Note> {
        let response = self.send(self.client.build_add_comment(story_id, text)?)?;
        self.client.parse_add_comment(response)
    }

    /// Fetch the story, move it to `new_state`, and save it.
    ///
    /// An unknown state name is rejected after the fetch and before the
    /// update is sent. When the fetch 404s, the service's reason is kept in
    /// the `NotFound` message since the project itself may be what is missing.
    pub fn update_state(&self, story_id: StoryId, new_state: &str) -> Result<Record> {
        let story = match self.find_story(story_id) {
            Ok(story) => story,
            Err(TrackerError::NotFound(reason)) => {
                debug!("story {story_id} not found: {reason}");
                return apply_state_change(None, story_id, new_state).map_err(|err| match err {
                    TrackerError::NotFound(message) => TrackerError::NotFound(format!("{message} ({reason})")),
                    other => other,
                });
            }
            Err(e) => return Err(e),
        };
        let story = apply_state_change(Some(story), story_id, new_state)?;
        self.update_story(&story)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method.as_str(), request.path);
        self.transport.send(&request)
    }
}
