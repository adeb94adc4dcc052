//! Installer manifest (`Distribution`) patching
//!
//! The vendor's `Distribution` document gates installation on the running OS
//! version through `<installation-check>` and `<volume-check>` elements.
//! Patching drops those elements (and anything nested inside them) while
//! copying every other event through unchanged, then reports the product
//! identity declared by the document.
//!
//! The vendor preference pane is not rebuilt, so its `pkg-ref`, `choice` and
//! outline `line` entries are dropped too.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use wdm_errors::{Error, PackagerError};

/// Elements that encode the OS compatibility predicate
const GATE_ELEMENTS: &[&[u8]] = &[
    b"installation-check",
    b"volume-check",
    b"allowed-os-versions",
];

/// Product name and version declared by a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductIdentity {
    pub name: String,
    pub version: String,
}

/// Result of patching a manifest document in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedManifest {
    pub identity: ProductIdentity,
    pub document: String,
    /// Number of elements removed (0 when already patched)
    pub removed: usize,
}

/// Why a manifest could not be patched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestProblem {
    Malformed(String),
    MissingField(&'static str),
}

/// Component packages containing this (case-insensitive) are left out
const EXCLUDED_COMPONENT_MARKER: &str = "PREFPANE";

fn is_gate(name: &[u8]) -> bool {
    GATE_ELEMENTS.contains(&name)
}

/// Whether the component package `file_name` is left out of the rebuild
#[must_use]
pub fn is_excluded_component(file_name: &str) -> bool {
    file_name
        .to_ascii_uppercase()
        .contains(EXCLUDED_COMPONENT_MARKER)
}

/// Whether a `pkg-ref` body such as `#NVPrefPane.pkg` names an excluded package
fn references_excluded(reference: &str) -> bool {
    let reference = reference.trim().trim_start_matches('#');
    let file_name = reference.rsplit('/').next().unwrap_or(reference);
    !file_name.is_empty() && is_excluded_component(file_name)
}

fn malformed(e: impl std::fmt::Display) -> ManifestProblem {
    ManifestProblem::Malformed(e.to_string())
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Result<Option<String>, ManifestProblem> {
    let Some(attr) = element.try_get_attribute(key).map_err(malformed)? else {
        return Ok(None);
    };
    let value = attr.unescape_value().map_err(malformed)?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// `pkg-ref` ids and choices that belong to excluded components
#[derive(Default)]
struct Exclusions {
    pkg_refs: HashSet<String>,
    choices: HashSet<String>,
}

impl Exclusions {
    fn scan(xml: &str) -> Result<Self, ManifestProblem> {
        let mut reader = Reader::from_str(xml);
        let mut open_choice: Option<String> = None;
        let mut open_ref: Option<String> = None;
        let mut reference = String::new();
        let mut choice_refs: Vec<(String, String)> = Vec::new();
        let mut pkg_refs = HashSet::new();

        loop {
            match reader.read_event().map_err(malformed)? {
                Event::Eof => break,
                Event::Start(element) => match element.name().as_ref() {
                    b"choice" => open_choice = attribute(&element, "id")?,
                    b"pkg-ref" => {
                        let id = attribute(&element, "id")?;
                        if let (Some(choice), Some(id)) = (&open_choice, &id) {
                            choice_refs.push((choice.clone(), id.clone()));
                        }
                        open_ref = id;
                        reference.clear();
                    }
                    _ => {}
                },
                Event::Empty(element) if element.name().as_ref() == b"pkg-ref" => {
                    if let (Some(choice), Some(id)) = (&open_choice, attribute(&element, "id")?) {
                        choice_refs.push((choice.clone(), id));
                    }
                }
                Event::Text(text) if open_ref.is_some() => {
                    reference.push_str(&text.unescape().map_err(malformed)?);
                }
                Event::End(element) => match element.name().as_ref() {
                    b"choice" => open_choice = None,
                    b"pkg-ref" => {
                        if let Some(id) = open_ref.take() {
                            if references_excluded(&reference) {
                                pkg_refs.insert(id);
                            }
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        // A choice goes only when every package it installs is excluded
        let mut all_excluded: HashMap<String, bool> = HashMap::new();
        for (choice, id) in choice_refs {
            let entry = all_excluded.entry(choice).or_insert(true);
            *entry &= pkg_refs.contains(&id);
        }
        let choices = all_excluded
            .into_iter()
            .filter_map(|(choice, excluded)| excluded.then_some(choice))
            .collect();

        Ok(Self { pkg_refs, choices })
    }

    fn drops(&self, element: &BytesStart<'_>) -> Result<bool, ManifestProblem> {
        let listed = |key: &str, set: &HashSet<String>| {
            attribute(element, key).map(|value| value.is_some_and(|v| set.contains(&v)))
        };
        match element.name().as_ref() {
            name if is_gate(name) => Ok(true),
            b"pkg-ref" => listed("id", &self.pkg_refs),
            b"choice" => listed("id", &self.choices),
            b"line" => listed("choice", &self.choices),
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
struct Identity {
    title: Option<String>,
    title_buf: Option<String>,
    product_version: Option<String>,
    pkg_ref_version: Option<String>,
}

impl Identity {
    fn inspect(&mut self, element: &BytesStart<'_>, empty: bool) -> Result<(), ManifestProblem> {
        match element.name().as_ref() {
            b"product" if self.product_version.is_none() => {
                self.product_version = attribute(element, "version")?;
            }
            b"pkg-ref" if self.pkg_ref_version.is_none() => {
                self.pkg_ref_version = attribute(element, "version")?;
            }
            b"title" if self.title.is_none() && !empty => {
                self.title_buf = Some(String::new());
            }
            _ => {}
        }
        Ok(())
    }

    fn capturing(&self) -> bool {
        self.title_buf.is_some()
    }

    fn text(&mut self, text: &str) {
        if let Some(buf) = &mut self.title_buf {
            buf.push_str(text);
        }
    }

    fn end(&mut self, name: &[u8]) {
        if name == b"title" {
            if let Some(buf) = self.title_buf.take() {
                let trimmed = buf.trim();
                if !trimmed.is_empty() {
                    self.title = Some(trimmed.to_string());
                }
            }
        }
    }

    fn finish(self) -> Result<ProductIdentity, ManifestProblem> {
        let name = self.title.ok_or(ManifestProblem::MissingField("title"))?;
        let version = self
            .product_version
            .or(self.pkg_ref_version)
            .ok_or(ManifestProblem::MissingField("version"))?;
        Ok(ProductIdentity { name, version })
    }
}

/// Remove the OS gate from a manifest document and read its identity
///
/// # Errors
///
/// Returns a [`ManifestProblem`] if the document is not well-formed XML or
/// declares no product name or version.
pub fn patch_document(xml: &str) -> Result<PatchedManifest, ManifestProblem> {
    let exclusions = Exclusions::scan(xml)?;
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut identity = Identity::default();
    let mut skip_depth = 0usize;
    let mut removed = 0usize;

    let write = |writer: &mut Writer<Vec<u8>>, event: Event<'_>| {
        writer.write_event(event).map_err(malformed)
    };

    loop {
        let event = reader.read_event().map_err(malformed)?;

        match event {
            Event::Eof => break,
            Event::Start(element) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                } else if exclusions.drops(&element)? {
                    skip_depth = 1;
                    removed += 1;
                } else {
                    identity.inspect(&element, false)?;
                    write(&mut writer, Event::Start(element))?;
                }
            }
            Event::End(element) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                } else {
                    identity.end(element.name().as_ref());
                    write(&mut writer, Event::End(element))?;
                }
            }
            Event::Empty(element) => {
                if skip_depth > 0 {
                    continue;
                }
                if exclusions.drops(&element)? {
                    removed += 1;
                } else {
                    identity.inspect(&element, true)?;
                    write(&mut writer, Event::Empty(element))?;
                }
            }
            Event::Text(text) => {
                if skip_depth == 0 {
                    if identity.capturing() {
                        let unescaped = text.unescape().map_err(malformed)?;
                        identity.text(&unescaped);
                    }
                    write(&mut writer, Event::Text(text))?;
                }
            }
            Event::CData(data) => {
                if skip_depth == 0 {
                    if identity.capturing() {
                        identity.text(&String::from_utf8_lossy(&data));
                    }
                    write(&mut writer, Event::CData(data))?;
                }
            }
            other => {
                if skip_depth == 0 {
                    write(&mut writer, other)?;
                }
            }
        }
    }

    let identity = identity.finish()?;
    let document = String::from_utf8(writer.into_inner()).map_err(malformed)?;

    Ok(PatchedManifest {
        identity,
        document,
        removed,
    })
}

/// Patch the manifest at `path` in place
///
/// The file is only rewritten after both name and version were found, and
/// only when patching changed it.
///
/// # Errors
///
/// Returns an error if the file is missing, malformed, or lacks a name or
/// version, or if the patched document cannot be written back.
pub async fn patch_manifest(path: &Path) -> Result<ProductIdentity, Error> {
    let shown = path.display().to_string();

    let contents = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PackagerError::ManifestNotFound { path: shown }.into())
        }
        Err(e) => return Err(Error::io_with_path(&e, path)),
    };
    let xml = String::from_utf8(contents).map_err(|e| PackagerError::ManifestMalformed {
        path: shown.clone(),
        message: e.to_string(),
    })?;

    let patched = patch_document(&xml).map_err(|problem| match problem {
        ManifestProblem::Malformed(message) => PackagerError::ManifestMalformed {
            path: shown.clone(),
            message,
        },
        ManifestProblem::MissingField(field) => PackagerError::ManifestFieldMissing {
            path: shown.clone(),
            field: field.to_string(),
        },
    })?;

    if patched.document != xml {
        tokio::fs::write(path, patched.document.as_bytes())
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
    }

    tracing::debug!(
        path = %shown,
        removed = patched.removed,
        name = %patched.identity.name,
        version = %patched.identity.version,
        "manifest patched"
    );

    Ok(patched.identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISTRIBUTION: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>
<installer-gui-script minSpecVersion="2">
    <title>NVIDIA Web Driver 387.10.10.10.40.105</title>
    <options customize="never" hostArchitectures="x86_64" rootVolumeOnly="true"/>
    <installation-check script="InstallationCheck()"/>
    <volume-check script="VolumeCheck()">
        <allowed-os-versions>
            <os-version min="10.13.6" before="10.13.7"/>
        </allowed-os-versions>
    </volume-check>
    <script><![CDATA[function InstallationCheck() { return system.version.ProductVersion == '10.13.6'; }]]></script>
    <choices-outline>
        <line choice="driver"/>
    </choices-outline>
    <choice id="driver" title="Driver">
        <pkg-ref id="com.nvidia.web-driver"/>
    </choice>
    <pkg-ref id="com.nvidia.web-driver" version="387.10.10.10.40.105" auth="root">#NVWebDrivers.pkg</pkg-ref>
    <product id="com.nvidia.web-driver" version="387.10.10.10.40.105.1"/>
</installer-gui-script>
"#;

    #[test]
    fn removes_gate_and_reads_identity() {
        let patched = patch_document(DISTRIBUTION).unwrap();
        assert_eq!(
            patched.identity,
            ProductIdentity {
                name: "NVIDIA Web Driver 387.10.10.10.40.105".into(),
                version: "387.10.10.10.40.105.1".into(),
            }
        );
        assert_eq!(patched.removed, 2);
        assert!(!patched.document.contains("installation-check"));
        assert!(!patched.document.contains("volume-check"));
        assert!(!patched.document.contains("allowed-os-versions"));
        assert!(patched.document.contains("hostArchitectures=\"x86_64\""));
        assert!(patched.document.contains("#NVWebDrivers.pkg"));
        assert!(patched.document.contains("<![CDATA[function InstallationCheck()"));
    }

    #[test]
    fn patching_is_idempotent() {
        let first = patch_document(DISTRIBUTION).unwrap();
        let second = patch_document(&first.document).unwrap();
        assert_eq!(first.identity, second.identity);
        assert_eq!(first.document, second.document);
        assert_eq!(second.removed, 0);
    }

    const WITH_PREF_PANE: &str = r#"<installer-gui-script minSpecVersion="2">
    <title>NVIDIA Web Driver 387.10.10.10.40.105</title>
    <volume-check script="VolumeCheck()"/>
    <choices-outline>
        <line choice="driver"/>
        <line choice="prefpane"/>
    </choices-outline>
    <choice id="driver" title="Driver">
        <pkg-ref id="com.nvidia.web-driver"/>
    </choice>
    <choice id="prefpane" title="Preferences">
        <pkg-ref id="com.nvidia.web-driver.prefpane"/>
    </choice>
    <pkg-ref id="com.nvidia.web-driver.prefpane" version="1.0" auth="root">#NVPrefPane.pkg</pkg-ref>
    <pkg-ref id="com.nvidia.web-driver" version="387.10.10.10.40.105" auth="root">#NVWebDrivers.pkg</pkg-ref>
</installer-gui-script>
"#;

    #[test]
    fn pref_pane_component_is_dropped() {
        let patched = patch_document(WITH_PREF_PANE).unwrap();
        assert!(!patched.document.contains("prefpane"));
        assert!(!patched.document.contains("NVPrefPane.pkg"));
        assert!(patched.document.contains("<line choice=\"driver\"/>"));
        assert!(patched.document.contains("#NVWebDrivers.pkg"));
        // volume-check, line, choice and pkg-ref
        assert_eq!(patched.removed, 4);
        // the pref pane's pkg-ref version is not taken as the product version
        assert_eq!(patched.identity.version, "387.10.10.10.40.105");

        let again = patch_document(&patched.document).unwrap();
        assert_eq!(again.document, patched.document);
        assert_eq!(again.removed, 0);
    }

    #[test]
    fn excluded_component_names() {
        assert!(is_excluded_component("NVPrefPane.pkg"));
        assert!(is_excluded_component("nvprefpane.pkg"));
        assert!(!is_excluded_component("NVWebDrivers.pkg"));
    }

    #[test]
    fn version_falls_back_to_pkg_ref() {
        let xml = r#"<installer-gui-script>
    <title>Driver</title>
    <pkg-ref id="a"/>
    <pkg-ref id="a" version="1.2.3">#a.pkg</pkg-ref>
</installer-gui-script>"#;
        let patched = patch_document(xml).unwrap();
        assert_eq!(patched.identity.version, "1.2.3");
        assert_eq!(patched.identity.name, "Driver");
    }

    #[test]
    fn missing_fields_are_reported() {
        let no_title = r#"<installer-gui-script><product version="1"/></installer-gui-script>"#;
        assert_eq!(
            patch_document(no_title),
            Err(ManifestProblem::MissingField("title"))
        );

        let no_version = r"<installer-gui-script><title>Driver</title></installer-gui-script>";
        assert_eq!(
            patch_document(no_version),
            Err(ManifestProblem::MissingField("version"))
        );

        let blank_title =
            r#"<installer-gui-script><title>  </title><product version="1"/></installer-gui-script>"#;
        assert_eq!(
            patch_document(blank_title),
            Err(ManifestProblem::MissingField("title"))
        );
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        let xml = r"<installer-gui-script><title>Driver</choice></installer-gui-script>";
        assert!(matches!(
            patch_document(xml),
            Err(ManifestProblem::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn patch_manifest_rewrites_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Distribution");
        std::fs::write(&path, DISTRIBUTION).unwrap();

        let identity = patch_manifest(&path).await.unwrap();
        assert_eq!(identity.version, "387.10.10.10.40.105.1");

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("volume-check"));

        let again = patch_manifest(&path).await.unwrap();
        assert_eq!(identity, again);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);
    }

    #[tokio::test]
    async fn invalid_manifest_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Distribution");
        let xml = r"<installer-gui-script><volume-check/></installer-gui-script>";
        std::fs::write(&path, xml).unwrap();

        let err = patch_manifest(&path).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Packager(PackagerError::ManifestFieldMissing { .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), xml);
    }

    #[tokio::test]
    async fn missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = patch_manifest(&dir.path().join("Distribution"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Packager(PackagerError::ManifestNotFound { .. })
        ));
    }
}
