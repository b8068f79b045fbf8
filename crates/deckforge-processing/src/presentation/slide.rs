//! PresentationML builders for generated slides

use std::fmt::Write as _;

use anyhow::{anyhow, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::ooxml::escape;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// English Metric Units per inch
pub const EMU_PER_INCH: f64 = 914_400.0;

/// First `sldId` value PowerPoint accepts
const FIRST_SLIDE_ID: u32 = 256;

/// A `<p:ph>` reference copied from a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub ph_type: Option<String>,
    pub idx: u32,
}

impl Placeholder {
    pub fn title() -> Self {
        Self {
            ph_type: Some("title".to_string()),
            idx: 0,
        }
    }

    pub fn body() -> Self {
        Self {
            ph_type: None,
            idx: 1,
        }
    }

    fn is_title(&self) -> bool {
        matches!(self.ph_type.as_deref(), Some("title") | Some("ctrTitle"))
    }

    fn is_decoration(&self) -> bool {
        matches!(
            self.ph_type.as_deref(),
            Some("dt") | Some("ftr") | Some("sldNum") | Some("hdr")
        )
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("<p:ph");
        if let Some(ph_type) = &self.ph_type {
            let _ = write!(xml, " type=\"{}\"", escape(ph_type));
        }
        if self.idx != 0 {
            let _ = write!(xml, " idx=\"{}\"", self.idx);
        }
        xml.push_str("/>");
        xml
    }
}

/// Title and body placeholders of a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlaceholders {
    pub title: Placeholder,
    pub body: Placeholder,
}

impl LayoutPlaceholders {
    /// Title is the `title`/`ctrTitle` placeholder; body is idx 1, else the
    /// first other non-decoration placeholder. Missing ones fall back to the
    /// standard title and body references.
    pub fn from_layout_xml(xml: &str) -> Result<Self> {
        let found = placeholders(xml)?;
        let title = found.iter().find(|p| p.is_title()).cloned();
        let body = found
            .iter()
            .find(|p| p.idx == 1 && !p.is_title())
            .or_else(|| {
                found
                    .iter()
                    .find(|p| !p.is_title() && !p.is_decoration())
            })
            .cloned();

        if title.is_none() || body.is_none() {
            tracing::warn!("Layout is missing a title or body placeholder; using defaults");
        }
        Ok(Self {
            title: title.unwrap_or_else(Placeholder::title),
            body: body.unwrap_or_else(Placeholder::body),
        })
    }
}

fn placeholders(xml: &str) -> Result<Vec<Placeholder>> {
    let mut reader = Reader::from_str(xml);
    let mut found = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().local_name().as_ref() == b"ph" => {
                let mut ph = Placeholder {
                    ph_type: None,
                    idx: 0,
                };
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value().map(|v| v.into_owned()).unwrap_or_default();
                    match attr.key.as_ref() {
                        b"type" => ph.ph_type = Some(value),
                        b"idx" => ph.idx = value.parse().unwrap_or(0),
                        _ => {}
                    }
                }
                found.push(ph);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("Invalid layout XML: {}", e)),
            _ => {}
        }
    }
    Ok(found)
}

/// A picture placed on a slide, positioned in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct PictureShape {
    pub rel_id: String,
    pub name: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

pub fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// Slide with a title and a body placeholder followed by pictures.
pub fn slide_xml(
    layout: &LayoutPlaceholders,
    title: &str,
    body: &str,
    pictures: &[PictureShape],
) -> String {
    let mut xml = String::with_capacity(2048);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    let _ = write!(
        xml,
        "<p:sld xmlns:a=\"{}\" xmlns:r=\"{}\" xmlns:p=\"{}\"><p:cSld><p:spTree>",
        NS_A, NS_R, NS_P
    );
    xml.push_str("<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>");
    xml.push_str("<p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/><a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>");

    placeholder_shape(&mut xml, 2, "Title 1", &layout.title, title);
    placeholder_shape(&mut xml, 3, "Content Placeholder 2", &layout.body, body);

    for (i, picture) in pictures.iter().enumerate() {
        picture_shape(&mut xml, 4 + i as u32, picture);
    }

    xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>");
    xml
}

fn placeholder_shape(xml: &mut String, id: u32, name: &str, ph: &Placeholder, text: &str) {
    let _ = write!(
        xml,
        "<p:sp><p:nvSpPr><p:cNvPr id=\"{}\" name=\"{}\"/><p:cNvSpPr><a:spLocks noGrp=\"1\"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr/>",
        id,
        name,
        ph.to_xml()
    );
    xml.push_str("<p:txBody><a:bodyPr/><a:lstStyle/>");
    xml.push_str(&paragraphs(text));
    xml.push_str("</p:txBody></p:sp>");
}

fn picture_shape(xml: &mut String, id: u32, picture: &PictureShape) {
    let _ = write!(
        xml,
        "<p:pic><p:nvPicPr><p:cNvPr id=\"{}\" name=\"{}\"/><p:cNvPicPr><a:picLocks noChangeAspect=\"1\"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>",
        id,
        escape(&picture.name)
    );
    let _ = write!(
        xml,
        "<p:blipFill><a:blip r:embed=\"{}\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>",
        escape(&picture.rel_id)
    );
    let _ = write!(
        xml,
        "<p:spPr><a:xfrm><a:off x=\"{}\" y=\"{}\"/><a:ext cx=\"{}\" cy=\"{}\"/></a:xfrm><a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr></p:pic>",
        emu(picture.left),
        emu(picture.top),
        emu(picture.width),
        emu(picture.height)
    );
}

/// One `<a:p>` per line; blank lines become empty paragraphs.
fn paragraphs(text: &str) -> String {
    let mut xml = String::new();
    let mut any = false;
    for line in text.lines() {
        any = true;
        let line: String = line
            .chars()
            .filter(|c| *c == '\t' || !c.is_control())
            .collect();
        if line.is_empty() {
            xml.push_str("<a:p><a:endParaRPr lang=\"en-US\" dirty=\"0\"/></a:p>");
        } else {
            let _ = write!(
                xml,
                "<a:p><a:r><a:rPr lang=\"en-US\" dirty=\"0\"/><a:t>{}</a:t></a:r></a:p>",
                escape(&line)
            );
        }
    }
    if !any {
        xml.push_str("<a:p><a:endParaRPr lang=\"en-US\" dirty=\"0\"/></a:p>");
    }
    xml
}

/// Rewrite `presentation.xml` so its slide list holds exactly `slide_rel_ids`.
///
/// The list goes after the master lists, where the schema requires it.
pub fn replace_slide_list(xml: &str, slide_rel_ids: &[String]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 64 * slide_rel_ids.len()));

    let mut depth = 0usize;
    let mut skip_depth: Option<usize> = None;
    let mut inserted = false;
    let mut slide_list = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| anyhow!("Invalid presentation XML at {}: {}", reader.buffer_position(), e))?;

        if let Some(level) = skip_depth {
            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == level {
                        skip_depth = None;
                    }
                }
                Event::Eof => return Err(anyhow!("Unterminated slide list")),
                _ => {}
            }
            continue;
        }

        match &event {
            Event::Start(e) if depth == 0 => {
                slide_list = slide_list_xml(e, slide_rel_ids);
            }
            Event::Start(e) | Event::Empty(e) if depth == 1 => {
                let name = e.name();
                match name.local_name().as_ref() {
                    b"sldMasterIdLst" | b"notesMasterIdLst" | b"handoutMasterIdLst" => {}
                    b"sldIdLst" => {
                        if matches!(event, Event::Start(_)) {
                            skip_depth = Some(depth);
                            depth += 1;
                        }
                        continue;
                    }
                    _ if !inserted => {
                        write_raw(&mut writer, &slide_list);
                        inserted = true;
                    }
                    _ => {}
                }
            }
            Event::End(_) if depth == 1 && !inserted => {
                write_raw(&mut writer, &slide_list);
                inserted = true;
            }
            _ => {}
        }

        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        if matches!(event, Event::Eof) {
            break;
        }
        writer
            .write_event(event)
            .map_err(|e| anyhow!("Failed to write presentation XML: {}", e))?;
    }

    if !inserted {
        return Err(anyhow!("Presentation XML has no root element"));
    }
    String::from_utf8(writer.into_inner()).map_err(|e| anyhow!("Invalid UTF-8 output: {}", e))
}

fn write_raw(writer: &mut Writer<Vec<u8>>, raw: &str) {
    writer.get_mut().extend_from_slice(raw.as_bytes());
}

/// `<p:sldIdLst>` using the root's own prefixes.
fn slide_list_xml(root: &BytesStart, slide_rel_ids: &[String]) -> String {
    let p = root
        .name()
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
    let mut r = None;
    for attr in root.attributes().flatten() {
        let value = attr.unescape_value().map(|v| v.into_owned()).unwrap_or_default();
        if value == NS_R {
            if let Some(prefix) = attr.key.as_ref().strip_prefix(b"xmlns:") {
                r = Some(String::from_utf8_lossy(prefix).into_owned());
            }
        }
    }

    let tag = match &p {
        Some(p) => format!("{}:", p),
        None => String::new(),
    };
    let (r, declare_r) = match r {
        Some(r) => (r, String::new()),
        None => ("r".to_string(), format!(" xmlns:r=\"{}\"", NS_R)),
    };

    let mut xml = format!("<{}sldIdLst{}>", tag, declare_r);
    for (i, rel_id) in slide_rel_ids.iter().enumerate() {
        let _ = write!(
            xml,
            "<{}sldId id=\"{}\" {}:id=\"{}\"/>",
            tag,
            FIRST_SLIDE_ID + i as u32,
            r,
            escape(rel_id)
        );
    }
    let _ = write!(xml, "</{}sldIdLst>", tag);
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_from_title_layout() {
        let xml = r#"<p:sldLayout xmlns:p="p"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr></p:sp><p:sp><p:nvSpPr><p:nvPr><p:ph type="dt" sz="half" idx="10"/></p:nvPr></p:nvSpPr></p:sp><p:sp><p:nvSpPr><p:nvPr><p:ph type="subTitle" idx="1"/></p:nvPr></p:nvSpPr></p:sp></p:spTree></p:cSld></p:sldLayout>"#;
        let layout = LayoutPlaceholders::from_layout_xml(xml).unwrap();
        assert_eq!(layout.title.ph_type.as_deref(), Some("ctrTitle"));
        assert_eq!(layout.body.ph_type.as_deref(), Some("subTitle"));
        assert_eq!(layout.body.to_xml(), r#"<p:ph type="subTitle" idx="1"/>"#);
    }

    #[test]
    fn test_layout_without_placeholders_uses_defaults() {
        let layout = LayoutPlaceholders::from_layout_xml("<p:sldLayout/>").unwrap();
        assert_eq!(layout.title, Placeholder::title());
        assert_eq!(layout.body.to_xml(), r#"<p:ph idx="1"/>"#);
    }

    #[test]
    fn test_paragraphs_split_lines_and_escape() {
        assert_eq!(
            paragraphs("a < b\n\nc\u{0}"),
            "<a:p><a:r><a:rPr lang=\"en-US\" dirty=\"0\"/><a:t>a &lt; b</a:t></a:r></a:p>\
             <a:p><a:endParaRPr lang=\"en-US\" dirty=\"0\"/></a:p>\
             <a:p><a:r><a:rPr lang=\"en-US\" dirty=\"0\"/><a:t>c</a:t></a:r></a:p>"
        );
        assert_eq!(
            paragraphs(""),
            "<a:p><a:endParaRPr lang=\"en-US\" dirty=\"0\"/></a:p>"
        );
    }

    #[test]
    fn test_emu_conversion() {
        assert_eq!(emu(1.0), 914_400);
        assert_eq!(emu(2.5), 2_286_000);
    }

    #[test]
    fn test_replace_slide_list_drops_old_entries() {
        let xml = r#"<?xml version="1.0"?><p:presentation xmlns:p="urn:p" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="300" r:id="rId9"/></p:sldIdLst><p:sldSz cx="1" cy="1"/></p:presentation>"#;
        let out = replace_slide_list(xml, &["rId7".to_string(), "rId8".to_string()]).unwrap();
        assert!(!out.contains("rId9"));
        assert!(out.contains(
            r#"</p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId7"/><p:sldId id="257" r:id="rId8"/></p:sldIdLst><p:sldSz"#
        ));
    }

    #[test]
    fn test_replace_slide_list_declares_missing_relationship_prefix() {
        let xml = r#"<presentation xmlns="urn:p"><sldMasterIdLst/></presentation>"#;
        let out = replace_slide_list(xml, &["rId2".to_string()]).unwrap();
        assert_eq!(
            out,
            format!(
                r#"<presentation xmlns="urn:p"><sldMasterIdLst/><sldIdLst xmlns:r="{}"><sldId id="256" r:id="rId2"/></sldIdLst></presentation>"#,
                NS_R
            )
        );
    }

    #[test]
    fn test_slide_xml_references_layout_placeholders() {
        let layout = LayoutPlaceholders {
            title: Placeholder {
                ph_type: Some("ctrTitle".to_string()),
                idx: 0,
            },
            body: Placeholder {
                ph_type: Some("subTitle".to_string()),
                idx: 1,
            },
        };
        let picture = PictureShape {
            rel_id: "rId2".to_string(),
            name: "Picture 1".to_string(),
            left: 5.0,
            top: 4.0,
            width: 2.5,
            height: 2.0,
        };
        let xml = slide_xml(&layout, "Deck", "About", &[picture]);
        assert!(xml.contains(r#"<p:ph type="ctrTitle"/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rId2"/>"#));
        assert!(xml.contains(r#"<a:off x="4572000" y="3657600"/><a:ext cx="2286000" cy="1828800"/>"#));
    }
}
