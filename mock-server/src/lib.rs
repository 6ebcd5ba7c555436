use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::{debug, info};
use serde::Deserialize;
use tokio::{net::TcpListener, sync::RwLock};

mod xml;

pub const DEFAULT_TOKEN: &str = "test-token";
pub const DEFAULT_PROJECT_ID: u64 = 1;
pub const TOKEN_HEADER: &str = "X-TrackerToken";
pub const AUTHOR: &str = "Mock User";

const STATES: [&str; 6] = ["unscheduled", "unstarted", "started", "finished", "delivered", "accepted"];

#[derive(Clone, Debug)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub iteration_length: i64,
    pub week_start_day: String,
    pub point_scale: String,
}

#[derive(Clone, Debug)]
pub struct Story {
    pub id: u64,
    pub project_id: u64,
    pub story_type: String,
    pub estimate: Option<i64>,
    pub current_state: String,
    pub name: String,
    pub description: String,
    pub requested_by: String,
    pub labels: String,
    pub notes: Vec<Note>,
}

#[derive(Clone, Debug)]
pub struct Note {
    pub id: u64,
    pub text: String,
    pub author: String,
    pub noted_at: String,
}

impl Story {
    /// Value used for `?filter=` matching. `state`, `type` and `label` are
    /// accepted as shorthands.
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            "name" => Some(self.name.clone()),
            "state" | "current_state" => Some(self.current_state.clone()),
            "type" | "story_type" => Some(self.story_type.clone()),
            "estimate" => self.estimate.map(|e| e.to_string()),
            "description" => Some(self.description.clone()),
            "requested_by" => Some(self.requested_by.clone()),
            "label" | "labels" => Some(self.labels.clone()),
            _ => None,
        }
    }

    fn matches(&self, field: &str, value: &str) -> bool {
        match field {
            "label" | "labels" => self.labels.split(',').any(|label| label.trim() == value),
            _ => self.field(field).as_deref() == Some(value),
        }
    }

    fn apply(&mut self, fields: &HashMap<String, String>) -> Result<(), Failure> {
        if let Some(state) = fields.get("current_state") {
            if !STATES.contains(&state.as_str()) {
                return Err(Failure::unprocessable(format!("Current state {state} is not a valid state")));
            }
            self.current_state = state.clone();
        }
        if let Some(estimate) = fields.get("estimate") {
            self.estimate = if estimate.is_empty() {
                None
            } else {
                Some(
                    estimate
                        .parse()
                        .map_err(|_| Failure::unprocessable("Estimate must be a number".to_string()))?,
                )
            };
        }
        let text_fields: [(&str, &mut String); 5] = [
            ("name", &mut self.name),
            ("story_type", &mut self.story_type),
            ("description", &mut self.description),
            ("requested_by", &mut self.requested_by),
            ("labels", &mut self.labels),
        ];
        for (name, slot) in text_fields {
            if let Some(value) = fields.get(name) {
                *slot = value.clone();
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Store {
    project: Project,
    stories: BTreeMap<u64, Story>,
    next_story_id: u64,
    next_note_id: u64,
}

impl Store {
    fn new(project_id: u64) -> Self {
        Self {
            project: Project {
                id: project_id,
                name: "Mock Project".to_string(),
                iteration_length: 1,
                week_start_day: "Monday".to_string(),
                point_scale: "0,1,2,3".to_string(),
            },
            stories: BTreeMap::new(),
            next_story_id: 1,
            next_note_id: 1,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    token: Arc<str>,
    store: Arc<RwLock<Store>>,
}

/// An error rendered as `<errors><error>…</error></errors>`.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn unprocessable(message: String) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message,
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Resource not found".to_string(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        debug!("responding {} {}", self.status, self.message);
        xml_response(self.status, xml::errors(&[self.message.as_str()]))
    }
}

type Reply = Result<Response, Failure>;

#[derive(Deserialize)]
pub struct ListParams {
    pub filter: Option<String>,
}

pub fn app() -> Router {
    app_with(DEFAULT_TOKEN, DEFAULT_PROJECT_ID)
}

pub fn app_with(token: &str, project_id: u64) -> Router {
    let state = AppState {
        token: Arc::from(token),
        store: Arc::new(RwLock::new(Store::new(project_id))),
    };
    Router::new()
        .route("/services/v3/projects/{project_id}", get(get_project))
        .route(
            "/services/v3/projects/{project_id}/stories",
            get(list_stories).post(create_story),
        )
        .route(
            "/services/v3/projects/{project_id}/stories/{story_id}",
            get(get_story).put(update_story).delete(delete_story),
        )
        .route(
            "/services/v3/projects/{project_id}/stories/{story_id}/notes",
            axum::routing::post(add_note),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    let presented = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok());
    if presented == Some(&*state.token) {
        return Ok(());
    }
    Err(Failure {
        status: StatusCode::UNAUTHORIZED,
        message: "Invalid or missing token".to_string(),
    })
}

fn check_project(store: &Store, project_id: u64) -> Result<(), Failure> {
    if store.project.id == project_id {
        Ok(())
    } else {
        Err(Failure {
            status: StatusCode::NOT_FOUND,
            message: format!("Project {project_id} not found"),
        })
    }
}

async fn get_project(State(state): State<AppState>, headers: HeaderMap, Path(project_id): Path<u64>) -> Reply {
    authorize(&state, &headers)?;
    let store = state.store.read().await;
    check_project(&store, project_id)?;
    info!("GET project {project_id}");
    Ok(xml_response(StatusCode::OK, xml::project(&store.project)))
}

async fn list_stories(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(project_id): Path<u64>,
    Query(params): Query<ListParams>,
) -> Reply {
    authorize(&state, &headers)?;
    let store = state.store.read().await;
    check_project(&store, project_id)?;
    let terms = match params.filter.as_deref() {
        Some(filter) => xml::filter_terms(filter).map_err(Failure::unprocessable)?,
        None => Vec::new(),
    };
    let matching: Vec<&Story> = store
        .stories
        .values()
        .filter(|story| terms.iter().all(|(field, value)| story.matches(field, value)))
        .collect();
    info!("GET stories for project {project_id}: {} of {}", matching.len(), store.stories.len());
    Ok(xml_response(StatusCode::OK, xml::stories_document(matching.into_iter())))
}

async fn create_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(project_id): Path<u64>,
    body: String,
) -> Reply {
    authorize(&state, &headers)?;
    let fields = xml::leaf_fields(&body, "story").map_err(Failure::unprocessable)?;
    let mut store = state.store.write().await;
    check_project(&store, project_id)?;
    if !fields.get("name").is_some_and(|name| !name.trim().is_empty()) {
        return Err(Failure::unprocessable("Name can't be blank".to_string()));
    }

    let mut story = Story {
        id: store.next_story_id,
        project_id,
        story_type: "feature".to_string(),
        estimate: None,
        current_state: "unscheduled".to_string(),
        name: String::new(),
        description: String::new(),
        requested_by: AUTHOR.to_string(),
        labels: String::new(),
        notes: Vec::new(),
    };
    story.apply(&fields)?;
    store.next_story_id += 1;
    info!("POST story {} ({})", story.id, story.name);
    let document = xml::story_document(&story);
    store.stories.insert(story.id, story);
    Ok(xml_response(StatusCode::CREATED, document))
}

async fn get_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((project_id, story_id)): Path<(u64, u64)>,
) -> Reply {
    authorize(&state, &headers)?;
    let store = state.store.read().await;
    check_project(&store, project_id)?;
    let story = store.stories.get(&story_id).ok_or_else(Failure::not_found)?;
    info!("GET story {story_id}");
    Ok(xml_response(StatusCode::OK, xml::story_document(story)))
}

async fn update_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((project_id, story_id)): Path<(u64, u64)>,
    body: String,
) -> Reply {
    authorize(&state, &headers)?;
    let fields = xml::leaf_fields(&body, "story").map_err(Failure::unprocessable)?;
    let mut store = state.store.write().await;
    check_project(&store, project_id)?;
    let story = store.stories.get_mut(&story_id).ok_or_else(Failure::not_found)?;
    let mut updated = story.clone();
    updated.apply(&fields)?;
    *story = updated;
    info!("PUT story {story_id} ({})", story.current_state);
    Ok(xml_response(StatusCode::OK, xml::story_document(story)))
}

async fn delete_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((project_id, story_id)): Path<(u64, u64)>,
) -> Reply {
    authorize(&state, &headers)?;
    let mut store = state.store.write().await;
    check_project(&store, project_id)?;
    let story = store.stories.remove(&story_id).ok_or_else(Failure::not_found)?;
    info!("DELETE story {story_id}");
    Ok(xml_response(StatusCode::OK, xml::story_document(&story)))
}

async fn add_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((project_id, story_id)): Path<(u64, u64)>,
    body: String,
) -> Reply {
    authorize(&state, &headers)?;
    let fields = xml::leaf_fields(&body, "note").map_err(Failure::unprocessable)?;
    let text = fields
        .get("text")
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| Failure::unprocessable("Text can't be blank".to_string()))?
        .clone();
    let mut store = state.store.write().await;
    check_project(&store, project_id)?;
    let note = Note {
        id: store.next_note_id,
        text,
        author: AUTHOR.to_string(),
        noted_at: "2024/01/01 12:00:00 UTC".to_string(),
    };
    let story = store.stories.get_mut(&story_id).ok_or_else(Failure::not_found)?;
    story.notes.push(note.clone());
    store.next_note_id += 1;
    info!("POST note {} on story {story_id}", note.id);
    Ok(xml_response(StatusCode::OK, xml::note_document(&note)))
}
