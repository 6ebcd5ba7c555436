//! Hand-rolled XML for the mock: rendering resources and reading the flat
//! bodies clients send. Kept apart from `tracker-core` so the client and
//! the server can drift independently and the integration test notices.

use std::collections::HashMap;
use std::fmt::Write;

use quick_xml::escape::{escape, resolve_predefined_entity};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{Note, Project, Story};

pub fn errors(messages: &[&str]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<errors>");
    for message in messages {
        let _ = write!(out, "<error>{}</error>", escape(*message));
    }
    out.push_str("</errors>");
    out
}

pub fn project(project: &Project) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project>");
    integer(&mut out, "id", project.id as i64);
    text(&mut out, "name", &project.name);
    integer(&mut out, "iteration_length", project.iteration_length);
    text(&mut out, "week_start_day", &project.week_start_day);
    text(&mut out, "point_scale", &project.point_scale);
    out.push_str("</project>");
    out
}

pub fn story_document(story: &Story) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    story_element(&mut out, story);
    out
}

pub fn stories_document<'a>(stories: impl ExactSizeIterator<Item = &'a Story>) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = write!(out, "<stories type=\"array\" count=\"{}\">", stories.len());
    for story in stories {
        story_element(&mut out, story);
    }
    out.push_str("</stories>");
    out
}

pub fn note_document(note: &Note) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    note_element(&mut out, note);
    out
}

fn story_element(out: &mut String, story: &Story) {
    out.push_str("<story>");
    integer(out, "id", story.id as i64);
    integer(out, "project_id", story.project_id as i64);
    text(out, "story_type", &story.story_type);
    text(out, "url", &format!("http://localhost/story/show/{}", story.id));
    if let Some(estimate) = story.estimate {
        integer(out, "estimate", estimate);
    }
    text(out, "current_state", &story.current_state);
    text(out, "description", &story.description);
    text(out, "name", &story.name);
    text(out, "requested_by", &story.requested_by);
    if !story.labels.is_empty() {
        text(out, "labels", &story.labels);
    }
    if !story.notes.is_empty() {
        out.push_str("<notes type=\"array\">");
        for note in &story.notes {
            note_element(out, note);
        }
        out.push_str("</notes>");
    }
    out.push_str("</story>");
}

fn note_element(out: &mut String, note: &Note) {
    out.push_str("<note>");
    integer(out, "id", note.id as i64);
    text(out, "text", &note.text);
    text(out, "author", &note.author);
    text(out, "noted_at", &note.noted_at);
    out.push_str("</note>");
}

fn integer(out: &mut String, name: &str, value: i64) {
    let _ = write!(out, "<{name} type=\"integer\">{value}</{name}>");
}

fn text(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, "<{name}>{}</{name}>", escape(value));
}

/// Leaf children of the document's `root` element, by name.
///
/// Elements that have children of their own (`notes`, for instance) are
/// skipped; the mock never updates them from a request.
pub fn leaf_fields(body: &str, root: &str) -> Result<HashMap<String, String>, String> {
    let mut reader = Reader::from_str(body);
    let mut fields = HashMap::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    // (name, text, has_children) of the open depth-2 element
    let mut current: Option<(String, String, bool)> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                depth += 1;
                match depth {
                    1 if name == root => seen_root = true,
                    1 => return Err(format!("expected <{root}>, got <{name}>")),
                    2 => current = Some((name, String::new(), false)),
                    _ => {
                        if let Some(open) = current.as_mut() {
                            open.2 = true;
                        }
                    }
                }
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                match depth {
                    0 if name == root => seen_root = true,
                    0 => return Err(format!("expected <{root}>, got <{name}>")),
                    1 => {
                        fields.insert(name, String::new());
                    }
                    _ => {
                        if let Some(open) = current.as_mut() {
                            open.2 = true;
                        }
                    }
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some((name, value, false)) = current.take() {
                        fields.insert(name, value);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(content) if depth == 2 => {
                if let Some(open) = current.as_mut() {
                    open.1.push_str(&content.decode().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(content) if depth == 2 => {
                if let Some(open) = current.as_mut() {
                    open.1.push_str(&content.decode().map_err(|e| e.to_string())?);
                }
            }
            Event::GeneralRef(reference) if depth == 2 => {
                let resolved = match reference.resolve_char_ref().map_err(|e| e.to_string())? {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = reference.decode().map_err(|e| e.to_string())?;
                        resolve_predefined_entity(&name)
                            .ok_or_else(|| format!("unknown entity &{name};"))?
                            .to_string()
                    }
                };
                if let Some(open) = current.as_mut() {
                    open.1.push_str(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(format!("expected <{root}>"));
    }
    Ok(fields)
}

/// Split `field:"value" other:"value"` into pairs.
pub fn filter_terms(filter: &str) -> Result<Vec<(String, String)>, String> {
    let mut terms = Vec::new();
    let mut rest = filter.trim_start();
    while !rest.is_empty() {
        let (field, after) = rest
            .split_once(':')
            .ok_or_else(|| format!("missing ':' in filter term {rest:?}"))?;
        let after = after
            .strip_prefix('"')
            .ok_or_else(|| format!("filter value for {field} must be quoted"))?;
        let (value, remainder) = after
            .split_once('"')
            .ok_or_else(|| format!("unterminated filter value for {field}"))?;
        terms.push((field.trim().to_string(), value.to_string()));
        rest = remainder.trim_start();
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_fields_skips_branches_and_decodes_text() {
        let body = r#"<story><id type="integer">7</id><name>Tom &amp; Jerry</name><notes><note><text>x</text></note></notes><labels/></story>"#;
        let fields = leaf_fields(body, "story").unwrap();
        assert_eq!(fields.get("id").map(String::as_str), Some("7"));
        assert_eq!(fields.get("name").map(String::as_str), Some("Tom & Jerry"));
        assert_eq!(fields.get("labels").map(String::as_str), Some(""));
        assert!(!fields.contains_key("notes"));
    }

    #[test]
    fn leaf_fields_rejects_wrong_root() {
        assert!(leaf_fields("<note><text>x</text></note>", "story").is_err());
        assert!(leaf_fields("", "story").is_err());
    }

    #[test]
    fn filter_terms_parses_quoted_pairs() {
        let terms = filter_terms(r#"label:"needs review" state:"started""#).unwrap();
        assert_eq!(
            terms,
            vec![
                ("label".to_string(), "needs review".to_string()),
                ("state".to_string(), "started".to_string()),
            ]
        );
        assert!(filter_terms("").unwrap().is_empty());
        assert!(filter_terms("state:started").is_err());
    }

    #[test]
    fn errors_escape_messages() {
        assert!(errors(&["a < b"]).ends_with("<errors><error>a &lt; b</error></errors>"));
    }
}
