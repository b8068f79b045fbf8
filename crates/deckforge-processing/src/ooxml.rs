//! In-memory Office Open XML package
//!
//! A `.pptx`/`.docx` is a zip of XML parts wired together by `.rels` files.
//! The loaders read parts from it and the renderer rewrites it, so the whole
//! package is held as a sorted map of part name to bytes.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::{Component, Path};

use anyhow::{anyhow, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
pub const REL_THEME: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
pub const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// Relationships of one part, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    pub items: Vec<Relationship>,
}

impl Relationships {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut rels = Relationships::default();
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().local_name().as_ref() == b"Relationship" =>
                {
                    let mut rel = Relationship {
                        id: String::new(),
                        rel_type: String::new(),
                        target: String::new(),
                        external: false,
                    };
                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map(|v| v.into_owned())
                            .unwrap_or_default();
                        match attr.key.as_ref() {
                            b"Id" => rel.id = value,
                            b"Type" => rel.rel_type = value,
                            b"Target" => rel.target = value,
                            b"TargetMode" => rel.external = value.eq_ignore_ascii_case("external"),
                            _ => {}
                        }
                    }
                    if !rel.id.is_empty() {
                        rels.items.push(rel);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(anyhow!("Invalid relationships XML: {}", e)),
                _ => {}
            }
        }

        Ok(rels)
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    pub fn of_type<'a>(&'a self, rel_type: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.items.iter().filter(move |r| r.rel_type == rel_type)
    }

    /// Next free `rIdN` id.
    pub fn next_id(&self) -> String {
        let max = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    pub fn push(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        let id = self.next_id();
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.into(),
            external: false,
        });
        id
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        );
        for rel in &self.items {
            xml.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"{}/>",
                escape(&rel.id),
                escape(&rel.rel_type),
                escape(&rel.target),
                if rel.external {
                    " TargetMode=\"External\""
                } else {
                    ""
                }
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// `[Content_Types].xml`: extension defaults and per-part overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    pub defaults: Vec<(String, String)>,
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut types = ContentTypes::default();
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                    let local = e.name().local_name().as_ref().to_vec();
                    let (key_attr, list) = match local.as_slice() {
                        b"Default" => (&b"Extension"[..], &mut types.defaults),
                        b"Override" => (&b"PartName"[..], &mut types.overrides),
                        _ => continue,
                    };
                    let mut key = String::new();
                    let mut content_type = String::new();
                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map(|v| v.into_owned())
                            .unwrap_or_default();
                        if attr.key.as_ref() == key_attr {
                            key = value;
                        } else if attr.key.as_ref() == b"ContentType" {
                            content_type = value;
                        }
                    }
                    if !key.is_empty() {
                        list.push((key, content_type));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(anyhow!("Invalid content types XML: {}", e)),
                _ => {}
            }
        }

        Ok(types)
    }

    pub fn has_default(&self, extension: &str) -> bool {
        self.defaults
            .iter()
            .any(|(ext, _)| ext.eq_ignore_ascii_case(extension))
    }

    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        if !self.has_default(extension) {
            self.defaults
                .push((extension.to_string(), content_type.to_string()));
        }
    }

    pub fn set_override(&mut self, part_name: &str, content_type: &str) {
        let part_name = format!("/{}", part_name.trim_start_matches('/'));
        self.overrides.retain(|(name, _)| *name != part_name);
        self.overrides.push((part_name, content_type.to_string()));
    }

    pub fn remove_overrides_under(&mut self, prefix: &str) {
        let prefix = format!("/{}", prefix.trim_start_matches('/'));
        self.overrides.retain(|(name, _)| !name.starts_with(&prefix));
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
        );
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                "<Default Extension=\"{}\" ContentType=\"{}\"/>",
                escape(ext),
                escape(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                "<Override PartName=\"{}\" ContentType=\"{}\"/>",
                escape(part),
                escape(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

#[derive(Debug, Clone, Default)]
pub struct OoxmlPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl OoxmlPackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).context("Not a valid zip archive")?;
        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).context("Corrupt zip entry")?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .with_context(|| format!("Failed to read part {}", name))?;
            parts.insert(name, data);
        }
        Ok(Self { parts })
    }

    pub fn from_parts<I, K, V>(parts: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        Self {
            parts: parts
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // Content types first, as Office expects
        let ordered = self
            .parts
            .iter()
            .filter(|(name, _)| name.as_str() == CONTENT_TYPES_PART)
            .chain(
                self.parts
                    .iter()
                    .filter(|(name, _)| name.as_str() != CONTENT_TYPES_PART),
            );
        for (name, data) in ordered {
            writer
                .start_file(name.as_str(), options)
                .with_context(|| format!("Failed to start part {}", name))?;
            writer
                .write_all(data)
                .with_context(|| format!("Failed to write part {}", name))?;
        }

        let cursor = writer.finish().context("Failed to finish package")?;
        Ok(cursor.into_inner())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn read_xml(&self, name: &str) -> Result<String> {
        let data = self
            .parts
            .get(name)
            .ok_or_else(|| anyhow!("Missing package part {}", name))?;
        let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        Ok(String::from_utf8_lossy(data).into_owned())
    }

    pub fn put(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.parts.insert(name.into(), data.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name)
    }

    /// Drop every part whose name starts with `prefix`.
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let before = self.parts.len();
        self.parts.retain(|name, _| !name.starts_with(prefix));
        before - self.parts.len()
    }

    /// Relationships of `part` (`""` for the package itself); empty when it has none.
    pub fn relationships(&self, part: &str) -> Result<Relationships> {
        let rels_name = rels_part_name(part);
        if !self.parts.contains_key(&rels_name) {
            return Ok(Relationships::default());
        }
        Relationships::parse(&self.read_xml(&rels_name)?)
    }

    pub fn put_relationships(&mut self, part: &str, rels: &Relationships) {
        self.put(rels_part_name(part), rels.to_xml());
    }

    pub fn content_types(&self) -> Result<ContentTypes> {
        ContentTypes::parse(&self.read_xml(CONTENT_TYPES_PART)?)
    }

    pub fn put_content_types(&mut self, types: &ContentTypes) {
        self.put(CONTENT_TYPES_PART, types.to_xml());
    }

    /// Part name of the main document (`ppt/presentation.xml`, `word/document.xml`).
    pub fn main_part(&self) -> Result<String> {
        let rels = self.relationships("")?;
        let main = rels
            .of_type(REL_OFFICE_DOCUMENT)
            .next()
            .map(|r| resolve_path("", &r.target))
            .ok_or_else(|| anyhow!("Package has no main document"));
        main
    }
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`
pub fn rels_part_name(part: &str) -> String {
    if part.is_empty() {
        return "_rels/.rels".to_string();
    }
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that owns the relationship.
pub fn resolve_path(base: &str, target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        return stripped.to_string();
    }

    let base_dir = Path::new(base).parent().unwrap_or(Path::new(""));
    let mut result = base_dir.to_path_buf();
    for component in Path::new(target).components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(c) => result.push(c),
            _ => {}
        }
    }

    result.to_string_lossy().replace('\\', "/")
}

/// Target of `part` relative to the directory of `base`.
pub fn relative_target(base: &str, part: &str) -> String {
    let base_dir: Vec<&str> = match base.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let part_segments: Vec<&str> = part.split('/').collect();
    let common = base_dir
        .iter()
        .zip(part_segments.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<&str> = vec![".."; base_dir.len() - common];
    segments.extend_from_slice(&part_segments[common..]);
    segments.join("/")
}

pub fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_part_name() {
        assert_eq!(rels_part_name(""), "_rels/.rels");
        assert_eq!(
            rels_part_name("ppt/presentation.xml"),
            "ppt/_rels/presentation.xml.rels"
        );
    }

    #[test]
    fn test_resolve_and_relative_target() {
        assert_eq!(
            resolve_path("ppt/slides/slide1.xml", "../slideLayouts/slideLayout2.xml"),
            "ppt/slideLayouts/slideLayout2.xml"
        );
        assert_eq!(
            resolve_path("ppt/presentation.xml", "slides/slide3.xml"),
            "ppt/slides/slide3.xml"
        );
        assert_eq!(resolve_path("", "/ppt/presentation.xml"), "ppt/presentation.xml");
        assert_eq!(
            relative_target("ppt/slides/slide1.xml", "ppt/media/image1.png"),
            "../media/image1.png"
        );
        assert_eq!(
            relative_target("ppt/presentation.xml", "ppt/slides/slide1.xml"),
            "slides/slide1.xml"
        );
    }

    #[test]
    fn test_relationships_parse_and_next_id() {
        let xml = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://x/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId7" Type="http://x/hyperlink" Target="https://a.b/?x=1&amp;y=2" TargetMode="External"/></Relationships>"#;
        let rels = Relationships::parse(xml).unwrap();
        assert_eq!(rels.items.len(), 2);
        assert_eq!(rels.get("rId7").unwrap().target, "https://a.b/?x=1&y=2");
        assert!(rels.get("rId7").unwrap().external);
        assert_eq!(rels.next_id(), "rId8");

        let reparsed = Relationships::parse(&rels.to_xml()).unwrap();
        assert_eq!(reparsed, rels);
    }

    #[test]
    fn test_content_types_overrides() {
        let mut types = ContentTypes::default();
        types.add_default("xml", "application/xml");
        types.add_default("XML", "application/xml");
        types.set_override("ppt/slides/slide1.xml", "slide");
        types.set_override("/ppt/presentation.xml", "presentation");
        types.remove_overrides_under("ppt/slides/");
        assert_eq!(types.defaults.len(), 1);
        assert_eq!(
            types.overrides,
            vec![(
                "/ppt/presentation.xml".to_string(),
                "presentation".to_string()
            )]
        );
        assert_eq!(ContentTypes::parse(&types.to_xml()).unwrap(), types);
    }

    #[test]
    fn test_package_zip_round_trip_keeps_parts() {
        let package = OoxmlPackage::from_parts([
            ("_rels/.rels", "<Relationships/>"),
            (CONTENT_TYPES_PART, "<Types/>"),
        ]);
        let bytes = package.to_bytes().unwrap();
        let reopened = OoxmlPackage::from_bytes(&bytes).unwrap();
        assert!(reopened.contains(CONTENT_TYPES_PART));
        assert_eq!(reopened.read_xml("_rels/.rels").unwrap(), "<Relationships/>");
    }
}
