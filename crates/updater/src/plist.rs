//! Minimal XML property list reader
//!
//! Covers the subset used by the vendor update feed and by kernel extension
//! `Info.plist` files: dictionaries, arrays and scalar values. Binary property
//! lists are not supported.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::path::Path;
use wdm_errors::{Error, UpdateError};

/// A property list value
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(String),
    Data(String),
    Array(Vec<PlistValue>),
    Dictionary(BTreeMap<String, PlistValue>),
}

impl PlistValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, PlistValue>> {
        match self {
            Self::Dictionary(map) => Some(map),
            _ => None,
        }
    }

    /// Look up `key` when this value is a dictionary
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.as_dictionary().and_then(|map| map.get(key))
    }

    /// String value stored under `key`, if any
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Self::as_str)
    }
}

type Parse<T> = std::result::Result<T, String>;

/// Parse an XML property list document
///
/// # Errors
///
/// Returns `UpdateError::PlistMalformed` if the document is not well-formed
/// XML or does not follow the property list structure.
pub fn parse(xml: &str) -> Result<PlistValue, Error> {
    parse_document(xml).map_err(|message| UpdateError::PlistMalformed { message }.into())
}

/// Read and parse a property list file
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or
/// `UpdateError::PlistMalformed` if it cannot be parsed.
pub async fn read_file(path: &Path) -> Result<PlistValue, Error> {
    let contents = tokio::fs::read(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    let xml = String::from_utf8(contents).map_err(|e| UpdateError::PlistMalformed {
        message: format!("{}: {e}", path.display()),
    })?;
    parse(&xml)
}

fn parse_document(xml: &str) -> Parse<PlistValue> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.name().as_ref() == b"plist" => {
                return next_value(&mut reader)?
                    .ok_or_else(|| "empty <plist> element".to_string());
            }
            // Bare value without the <plist> wrapper
            Event::Start(e) => return parse_element(&mut reader, e.name().as_ref()),
            Event::Empty(e) => return parse_empty(e.name().as_ref()),
            Event::Eof => return Err("document has no root element".to_string()),
            _ => {}
        }
    }
}

/// Next value inside a container; `None` at the container's end tag
fn next_value(reader: &mut Reader<&[u8]>) -> Parse<Option<PlistValue>> {
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => return parse_element(reader, e.name().as_ref()).map(Some),
            Event::Empty(e) => return parse_empty(e.name().as_ref()).map(Some),
            Event::End(_) => return Ok(None),
            Event::Comment(_) | Event::PI(_) => {}
            Event::Eof => return Err("unexpected end of document".to_string()),
            other => return Err(format!("unexpected content: {other:?}")),
        }
    }
}

fn parse_element(reader: &mut Reader<&[u8]>, name: &[u8]) -> Parse<PlistValue> {
    match name {
        b"dict" => parse_dictionary(reader),
        b"array" => {
            let mut items = Vec::new();
            while let Some(item) = next_value(reader)? {
                items.push(item);
            }
            Ok(PlistValue::Array(items))
        }
        b"string" => read_text(reader).map(PlistValue::String),
        b"date" => read_text(reader).map(PlistValue::Date),
        b"data" => read_text(reader).map(PlistValue::Data),
        b"integer" => {
            let text = read_text(reader)?;
            text.parse()
                .map(PlistValue::Integer)
                .map_err(|e| format!("invalid integer {text:?}: {e}"))
        }
        b"real" => {
            let text = read_text(reader)?;
            text.parse()
                .map(PlistValue::Real)
                .map_err(|e| format!("invalid real {text:?}: {e}"))
        }
        b"true" | b"false" => {
            read_text(reader)?;
            parse_empty(name)
        }
        other => Err(format!(
            "unsupported element <{}>",
            String::from_utf8_lossy(other)
        )),
    }
}

fn parse_empty(name: &[u8]) -> Parse<PlistValue> {
    match name {
        b"true" => Ok(PlistValue::Boolean(true)),
        b"false" => Ok(PlistValue::Boolean(false)),
        b"string" => Ok(PlistValue::String(String::new())),
        b"dict" => Ok(PlistValue::Dictionary(BTreeMap::new())),
        b"array" => Ok(PlistValue::Array(Vec::new())),
        other => Err(format!(
            "unsupported empty element <{}/>",
            String::from_utf8_lossy(other)
        )),
    }
}

fn parse_dictionary(reader: &mut Reader<&[u8]>) -> Parse<PlistValue> {
    let mut map = BTreeMap::new();
    loop {
        let key = match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.name().as_ref() == b"key" => read_text(reader)?,
            Event::Empty(e) if e.name().as_ref() == b"key" => String::new(),
            Event::End(_) => return Ok(PlistValue::Dictionary(map)),
            Event::Comment(_) | Event::PI(_) => continue,
            Event::Eof => return Err("unterminated <dict>".to_string()),
            other => return Err(format!("expected <key> in <dict>, found {other:?}")),
        };
        let value = next_value(reader)?.ok_or_else(|| format!("key {key:?} has no value"))?;
        map.insert(key, value);
    }
}

/// Text content up to the current element's end tag
fn read_text(reader: &mut Reader<&[u8]>) -> Parse<String> {
    let mut text = String::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(|e| e.to_string())?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => return Ok(text),
            Event::Comment(_) => {}
            Event::Eof => return Err("unterminated text element".to_string()),
            other => return Err(format!("unexpected markup in text: {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleGetInfoString</key>
	<string>GeForceWeb 387.10.10.10.40.105 &amp; more</string>
	<key>CFBundleVersion</key>
	<string>387.10.10.10.40.105</string>
	<key>OSBundleRequired</key>
	<true/>
	<key>IOKitPersonalities</key>
	<dict/>
	<key>Count</key>
	<integer>3</integer>
	<key>Libraries</key>
	<array>
		<string>com.apple.iokit.IOPCIFamily</string>
		<!-- comment -->
		<string>com.apple.kpi.bsd</string>
	</array>
</dict>
</plist>
"#;

    #[test]
    fn parses_nested_structures() {
        let plist = parse(INFO_PLIST).unwrap();

        assert_eq!(
            plist.get_str("CFBundleGetInfoString"),
            Some("GeForceWeb 387.10.10.10.40.105 & more")
        );
        assert_eq!(plist.get("OSBundleRequired"), Some(&PlistValue::Boolean(true)));
        assert_eq!(plist.get("Count"), Some(&PlistValue::Integer(3)));
        assert_eq!(
            plist
                .get("IOKitPersonalities")
                .and_then(PlistValue::as_dictionary)
                .map(BTreeMap::len),
            Some(0)
        );
        let libraries = plist.get("Libraries").and_then(PlistValue::as_array).unwrap();
        assert_eq!(libraries.len(), 2);
        assert_eq!(libraries[1].as_str(), Some("com.apple.kpi.bsd"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse("<plist><dict><key>a</key></dict></plist>").is_err());
        assert!(parse("<plist><dict><string>a</string></dict></plist>").is_err());
        assert!(parse("<plist><integer>x</integer></plist>").is_err());
        assert!(parse("<plist><dict>").is_err());
        assert!(parse("").is_err());
    }

    #[tokio::test]
    async fn reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Info.plist");
        tokio::fs::write(&path, INFO_PLIST).await.unwrap();

        let plist = read_file(&path).await.unwrap();
        assert_eq!(plist.get_str("CFBundleVersion"), Some("387.10.10.10.40.105"));
        assert!(read_file(&dir.path().join("missing.plist")).await.is_err());
    }
}
