//! Full story lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every `Tracker`
//! operation over real HTTP through `UreqTransport`. Validates that request
//! building, validation and mapping work end-to-end with the actual server.

use std::time::Duration;

use tracker_core::{Record, Tracker, TrackerConfig, TrackerError, UreqTransport};

/// Start the mock server on a random port and return its base URL.
fn start_mock_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn config(base_url: &str) -> TrackerConfig {
    TrackerConfig::new(mock_server::DEFAULT_PROJECT_ID.to_string(), mock_server::DEFAULT_TOKEN)
        .with_base_url(base_url)
}

#[test]
fn story_lifecycle() {
    let base_url = start_mock_server();
    let tracker = Tracker::from_config(&config(&base_url));

    // Step 1: project metadata.
    let project = tracker.project().unwrap();
    assert_eq!(project.name, "Mock Project");
    assert_eq!(project.iteration_length, 1);
    assert_eq!(project.week_start_day, "Monday");

    // Step 2: list, still empty.
    assert!(tracker.stories().unwrap().is_empty(), "expected empty list");

    // Step 3: create two stories.
    let input = Record::new()
        .with("name", "Fix <login> & logout")
        .with("story_type", "bug")
        .with("labels", "backend,urgent")
        .with("estimate", 3);
    let created = tracker.create_story(&input).unwrap();
    assert_eq!(created.get_str("name"), Some("Fix <login> & logout"));
    assert_eq!(created.get_integer("estimate"), Some(3));
    assert_eq!(created.get_str("current_state"), Some("unscheduled"));
    let id = created.get_integer("id").unwrap() as u64;

    let other = tracker
        .create_story(&Record::new().with("name", "Write docs").with("labels", "docs"))
        .unwrap();
    let other_id = other.get_integer("id").unwrap() as u64;

    // Step 4: fetch one.
    let fetched = tracker.find_story(id).unwrap();
    assert_eq!(fetched, created);

    // Step 5: filtered listing.
    let urgent = tracker.find(&[("label", "urgent")]).unwrap();
    assert_eq!(urgent.len(), 1);
    assert_eq!(urgent[0].get_integer("id"), Some(id as i64));
    assert_eq!(tracker.find(&[]).unwrap().len(), 2);
    assert!(tracker
        .find(&[("label", "docs"), ("type", "bug")])
        .unwrap()
        .is_empty());

    // Step 6: state changes.
    let started = tracker.update_state(id, "started").unwrap();
    assert_eq!(started.get_str("current_state"), Some("started"));
    assert_eq!(started.get_str("name"), Some("Fix <login> & logout"));

    let err = tracker.update_state(id, "bogus").unwrap_err();
    assert!(matches!(err, TrackerError::InvalidState { .. }));
    assert_eq!(
        tracker.find_story(id).unwrap().get_str("current_state"),
        Some("started")
    );

    let err = tracker.update_state(9_999, "started").unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(msg) if msg == "no story with id: 9999 (Resource not found)"));

    // Step 7: plain update.
    let mut edited = tracker.find_story(other_id).unwrap();
    edited.insert("description", "Covers the XML client");
    let updated = tracker.update_story(&edited).unwrap();
    assert_eq!(updated.get_str("description"), Some("Covers the XML client"));

    // Step 8: comment; the fetched story then carries a nested notes record.
    let note = tracker.add_comment(id, "Reproduced & fixed").unwrap();
    assert_eq!(note.text, "Reproduced & fixed");
    assert_eq!(note.author, mock_server::AUTHOR);
    let with_note = tracker.find_story(id).unwrap();
    let nested = with_note
        .get_record("notes")
        .and_then(|notes| notes.get_record("note"))
        .unwrap();
    assert_eq!(nested.get_integer("id"), Some(note.id));

    // Step 9: a story with nested notes can still be moved along.
    let delivered = tracker.update_state(id, "delivered").unwrap();
    assert_eq!(delivered.get_str("current_state"), Some("delivered"));

    // Step 10: service-side validation errors surface their message.
    let err = tracker.create_story(&Record::new().with("story_type", "chore")).unwrap_err();
    assert!(matches!(err, TrackerError::Validation(msg) if msg.starts_with("Name can")));

    // Step 11: delete, then the story is gone.
    assert_eq!(tracker.delete_story(id).unwrap(), id);
    assert!(matches!(tracker.find_story(id), Err(TrackerError::NotFound(_))));
    assert!(matches!(tracker.delete_story(id), Err(TrackerError::NotFound(_))));
    assert_eq!(tracker.stories().unwrap().len(), 1);
}

#[test]
fn wrong_token_reports_service_message() {
    let base_url = start_mock_server();
    let config = TrackerConfig::new("1", "wrong-token").with_base_url(&base_url);
    let tracker = Tracker::new(&config, UreqTransport::new());

    let err = tracker.stories().unwrap_err();
    assert!(matches!(err, TrackerError::Validation(msg) if msg == "Invalid or missing token"));
}

#[test]
fn update_state_in_unknown_project_reports_the_project() {
    let base_url = start_mock_server();
    let config = TrackerConfig::new("2", mock_server::DEFAULT_TOKEN).with_base_url(&base_url);
    let tracker = Tracker::from_config(&config);

    let err = tracker.update_state(1, "started").unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(msg) if msg == "no story with id: 1 (Project 2 not found)"));
}

#[test]
fn unreachable_host_is_a_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let tracker = Tracker::from_config(&config(&format!("http://{addr}")));

    assert!(matches!(tracker.project(), Err(TrackerError::Transport(_))));
}

#[test]
fn caller_supplied_agent_is_used() {
    let base_url = start_mock_server();

    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(5)))
        .build()
        .new_agent();
    let tracker = Tracker::new(&config(&base_url), UreqTransport::with_agent(agent));
    assert_eq!(tracker.project().unwrap().name, "Mock Project");

    // A stock agent turns the 401 into an error before the body is read.
    let wrong = TrackerConfig::new("1", "wrong-token").with_base_url(&base_url);
    let tracker = Tracker::new(&wrong, UreqTransport::with_agent(ureq::Agent::new_with_defaults()));
    assert!(matches!(tracker.project(), Err(TrackerError::Transport(_))));
}
