//! Record-to-markup serialization for request bodies.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Result, TrackerError};
use crate::record::{Record, Value};

/// Render `record` as `<root_tag>…</root_tag>`.
///
/// Text is fully escaped. Integers carry `type="integer"` so that mapping
/// the output again yields the same record. Element names cannot be escaped,
/// so a root tag or field name that is not an XML name is an error.
pub fn record_to_markup(record: &Record, root_tag: &str) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    write_record(&mut writer, root_tag, record)?;
    String::from_utf8(writer.into_inner()).map_err(|e| TrackerError::Serialization(e.to_string()))
}

/// Render a single text element, e.g. `<note><text>…</text></note>`.
pub fn text_element(root_tag: &str, field: &str, text: &str) -> Result<String> {
    record_to_markup(&Record::new().with(field, text), root_tag)
}

fn write_record(writer: &mut Writer<Vec<u8>>, tag: &str, record: &Record) -> Result<()> {
    write(writer, Event::Start(start_tag(tag)?))?;
    for (name, value) in record {
        write_value(writer, name, value)?;
    }
    write(writer, Event::End(BytesEnd::new(tag)))
}

fn write_value(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Record(nested) => write_record(writer, name, nested),
        Value::Integer(n) => {
            let start = start_tag(name)?.with_attributes([("type", "integer")]);
            write(writer, Event::Start(start))?;
            write(writer, Event::Text(BytesText::new(&n.to_string())))?;
            write(writer, Event::End(BytesEnd::new(name)))
        }
        Value::Text(text) => {
            write(writer, Event::Start(start_tag(name)?))?;
            write(writer, Event::Text(BytesText::new(text)))?;
            write(writer, Event::End(BytesEnd::new(name)))
        }
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| TrackerError::Serialization(e.to_string()))
}

fn start_tag(name: &str) -> Result<BytesStart<'_>> {
    if !is_xml_name(name) {
        return Err(TrackerError::Serialization(format!("{name:?} is not a valid element name")));
    }
    Ok(BytesStart::new(name))
}

/// The `Name` production of XML 1.0 (fifth edition).
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}
