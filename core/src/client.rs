//! Stateless HTTP request builder and response parser for the tracker API.
//!
//! # Design
//! `TrackerClient` holds only the project URL and the token. Each operation
//! is split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes the `HttpResponse`. Every `parse_*` runs
//! the validator before any field is read, then hands the selected subtree
//! to the mapper. Nothing is cached between calls.

use log::{debug, trace};

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::mapper::map_element;
use crate::markup::Element;
use crate::record::Record;
use crate::serialize::{record_to_markup, text_element};
use crate::story::{story_id, Note, Project, StoryId};
use crate::validate::validate_document;

pub const TOKEN_HEADER: &str = "X-TrackerToken";
const XML_CONTENT_TYPE: &str = "application/xml";

/// Synchronous, stateless client for one tracker project.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    project_url: String,
    token: String,
}

impl TrackerClient {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            project_url: config.project_url(),
            token: config.token.clone(),
        }
    }

    pub fn project_url(&self) -> &str {
        &self.project_url
    }

    pub fn build_project(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.project_url.clone(), None)
    }

    pub fn build_list_stories(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.stories_url(), None)
    }

    /// List stories matching every `(field, value)` pair.
    ///
    /// Pairs are rendered as `field:"value"`, joined with spaces and
    /// percent-encoded into a single `filter` parameter. No pairs is the same
    /// request as `build_list_stories`.
    pub fn build_find_stories(&self, filters: &[(&str, &str)]) -> HttpRequest {
        if filters.is_empty() {
            return self.build_list_stories();
        }
        let filter = filters
            .iter()
            .map(|(field, value)| format!("{field}:\"{value}\""))
            .collect::<Vec<_>>()
            .join(" ");
        let path = format!("{}?filter={}", self.stories_url(), urlencoding::encode(&filter));
        self.request(HttpMethod::Get, path, None)
    }

    pub fn build_get_story(&self, id: StoryId) -> HttpRequest {
        self.request(HttpMethod::Get, self.story_url(id), None)
    }

    pub fn build_create_story(&self, story: &Record) -> Result<HttpRequest> {
        let body = record_to_markup(story, "story")?;
        Ok(self.request(HttpMethod::Post, self.stories_url(), Some(body)))
    }

    /// Update the story named by the record's `id` field.
    pub fn build_update_story(&self, story: &Record) -> Result<HttpRequest> {
        let id = story_id(story)?;
        let body = record_to_markup(story, "story")?;
        Ok(self.request(HttpMethod::Put, self.story_url(id), Some(body)))
    }

    pub fn build_delete_story(&self, id: StoryId) -> HttpRequest {
        self.request(HttpMethod::Delete, self.story_url(id), None)
    }

    pub fn build_add_comment(&self, story_id: StoryId, text: &str) -> Result<HttpRequest> {
        let body = text_element("note", "text", text)?;
        let path = format!("{}/notes", self.story_url(story_id));
        Ok(self.request(HttpMethod::Post, path, Some(body)))
    }

    pub fn parse_project(&self, response: HttpResponse) -> Result<Project> {
        let document = checked_document(&response, "project")?;
        let record = map_element(expect_element(&document, "project")?)?;
        Project::from_record(&record)
    }

    pub fn parse_list_stories(&self, response: HttpResponse) -> Result<Vec<Record>> {
        let document = checked_document(&response, "stories")?;
        let stories = document
            .find_all("stories > story")
            .into_iter()
            .map(map_element)
            .collect::<Result<Vec<_>>>()?;
        debug!("parsed {} stories", stories.len());
        Ok(stories)
    }

    pub fn parse_find_stories(&self, response: HttpResponse) -> Result<Vec<Record>> {
        self.parse_list_stories(response)
    }

    pub fn parse_get_story(&self, response: HttpResponse) -> Result<Record> {
        parse_story(&response)
    }

    pub fn parse_create_story(&self, response: HttpResponse) -> Result<Record> {
        parse_story(&response)
    }

    pub fn parse_update_story(&self, response: HttpResponse) -> Result<Record> {
        parse_story(&response)
    }

    pub fn parse_delete_story(&self, response: HttpResponse) -> Result<()> {
        checked_document(&response, "story").map(|_| ())
    }

    pub fn parse_add_comment(&self, response: HttpResponse) -> Result<Note> {
        let document = checked_document(&response, "note")?;
        let record = map_element(expect_element(&document, "note")?)?;
        Note::from_record(&record)
    }

    fn stories_url(&self) -> String {
        format!("{}/stories", self.project_url)
    }

    fn story_url(&self, id: StoryId) -> String {
        format!("{}/stories/{id}", self.project_url)
    }

    fn request(&self, method: HttpMethod, path: String, body: Option<String>) -> HttpRequest {
        let mut headers = vec![(TOKEN_HEADER.to_string(), self.token.clone())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), XML_CONTENT_TYPE.to_string()));
        }
        trace!("built {} {path}", method.as_str());
        HttpRequest {
            method,
            path,
            headers,
            body,
        }
    }
}

fn parse_story(response: &HttpResponse) -> Result<Record> {
    let document = checked_document(response, "story")?;
    map_element(expect_element(&document, "story")?)
}

/// Parse the body, map 404 to `NotFound`, and validate against `expected_root`.
fn checked_document(response: &HttpResponse, expected_root: &str) -> Result<Element> {
    if response.status == 404 {
        return Err(TrackerError::NotFound(not_found_message(&response.body)));
    }
    let document = Element::parse(&response.body)?;
    validate_document(&document, expected_root)?;
    Ok(document)
}

fn expect_element<'a>(document: &'a Element, name: &str) -> Result<&'a Element> {
    document
        .find(name)
        .ok_or_else(|| TrackerError::Validation(format!("expected response root element to be {name}, got none")))
}

/// The service's own wording when the 404 body carries one.
fn not_found_message(body: &[u8]) -> String {
    let reported = Element::parse(body).ok().map(|document| {
        document
            .find_all("errors > error")
            .into_iter()
            .map(Element::text)
            .collect::<Vec<_>>()
            .join("; ")
    });
    match reported {
        Some(message) if !message.is_empty() => message,
        _ => "resource not found".to_string(),
    }
}
