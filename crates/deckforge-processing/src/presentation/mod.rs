//! `.pptx` rendering
//!
//! The template's slides are stripped, then one title slide (layout 0) and
//! one content slide per deck slide (layout 1) are added. Overlay image group
//! `i` is placed on content slide `i`.

mod slide;
mod template;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use deckforge_core::models::SlideDeck;
use deckforge_core::Config;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::ooxml::{
    relative_target, resolve_path, OoxmlPackage, Relationships, REL_IMAGE, REL_SLIDE,
    REL_SLIDE_LAYOUT, REL_SLIDE_MASTER,
};
use slide::{LayoutPlaceholders, PictureShape};

pub use slide::{emu, EMU_PER_INCH};

const SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const MAX_TITLE_CHARS: usize = 100;
const FALLBACK_TITLE: &str = "presentation";

/// An image placed at a fixed position, in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayImage {
    pub path: PathBuf,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl OverlayImage {
    pub fn new(path: impl Into<PathBuf>, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            path: path.into(),
            left,
            top,
            width,
            height,
        }
    }
}

/// The two stock groups: the Python logo, then the code picture.
pub fn default_overlays(dir: &Path) -> Vec<Vec<OverlayImage>> {
    vec![
        vec![OverlayImage::new(dir.join("Python-Symbol.png"), 5.0, 4.0, 2.5, 2.0)],
        vec![OverlayImage::new(dir.join("code.jpg"), 5.0, 4.0, 2.5, 2.0)],
    ]
}

/// File stem for a deck title: whitespace to `_`, only `[A-Za-z0-9_.-]`, at most 100 chars.
pub fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .take(MAX_TITLE_CHARS)
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        FALLBACK_TITLE.to_string()
    } else {
        sanitized
    }
}

#[derive(Debug, Clone)]
pub struct PresentationRenderer {
    template_path: Option<PathBuf>,
    results_dir: PathBuf,
    overlays: Vec<Vec<OverlayImage>>,
}

impl PresentationRenderer {
    pub fn new(
        template_path: Option<PathBuf>,
        results_dir: impl Into<PathBuf>,
        overlays: Vec<Vec<OverlayImage>>,
    ) -> Self {
        Self {
            template_path,
            results_dir: results_dir.into(),
            overlays,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.template_path.clone(),
            config.results_dir.clone(),
            default_overlays(&config.overlay_images_dir),
        )
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn output_path(&self, title: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}.pptx", sanitize_title(title)))
    }

    /// Render the deck and save it under the results directory.
    pub fn render(&self, deck: &SlideDeck) -> Result<PathBuf> {
        let bytes = self.render_to_bytes(deck)?;
        std::fs::create_dir_all(&self.results_dir).with_context(|| {
            format!(
                "Failed to create results directory {}",
                self.results_dir.display()
            )
        })?;

        let path = self.output_path(&deck.title);
        tracing::info!(path = %path.display(), "Creating new PPT file");
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            slides = deck.rendered_slide_count(),
            "The PPTX file is saved successfully"
        );
        Ok(path)
    }

    pub fn render_to_bytes(&self, deck: &SlideDeck) -> Result<Vec<u8>> {
        let mut package = self.load_template()?;
        let main = package.main_part()?;

        clear_slides(&mut package, &main)?;
        let layouts = layout_parts(&package, &main)?;
        if layouts.len() < 2 {
            return Err(anyhow!(
                "Template needs a title layout and a content layout, found {}",
                layouts.len()
            ));
        }
        let title_layout = LayoutPlaceholders::from_layout_xml(&package.read_xml(&layouts[0])?)?;
        let content_layout = LayoutPlaceholders::from_layout_xml(&package.read_xml(&layouts[1])?)?;

        let mut builder = SlideBuilder::new(&mut package, &main);
        builder.add(&layouts[0], &title_layout, &deck.title, &deck.description, &[])?;

        for (i, content) in deck.slides.iter().enumerate() {
            let overlays = self.overlays.get(i).map(Vec::as_slice).unwrap_or(&[]);
            builder.add(
                &layouts[1],
                &content_layout,
                &content.title,
                &content.content,
                overlays,
            )?;
        }
        builder.finish()?;

        package.to_bytes()
    }

    fn load_template(&self) -> Result<OoxmlPackage> {
        match &self.template_path {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read template {}", path.display()))?;
                OoxmlPackage::from_bytes(&bytes)
                    .with_context(|| format!("Invalid template {}", path.display()))
            }
            None => Ok(template::builtin()),
        }
    }
}

/// Remove every slide and notes slide, and their references.
fn clear_slides(package: &mut OoxmlPackage, main: &str) -> Result<()> {
    let mut rels = package.relationships(main)?;
    let before = rels.items.len();
    rels.items.retain(|r| r.rel_type != REL_SLIDE);
    let removed_rels = before - rels.items.len();
    package.put_relationships(main, &rels);

    let removed_parts =
        package.remove_prefix("ppt/slides/") + package.remove_prefix("ppt/notesSlides/");

    let mut types = package.content_types()?;
    types.remove_overrides_under("ppt/slides/");
    types.remove_overrides_under("ppt/notesSlides/");
    package.put_content_types(&types);

    let xml = package.read_xml(main)?;
    package.put(main, slide::replace_slide_list(&xml, &[])?);

    tracing::debug!(
        relationships = removed_rels,
        parts = removed_parts,
        "Removed template slides"
    );
    Ok(())
}

/// Layout part names of the first slide master, in `sldLayoutIdLst` order.
fn layout_parts(package: &OoxmlPackage, main: &str) -> Result<Vec<String>> {
    let rels = package.relationships(main)?;
    let master = rels
        .of_type(REL_SLIDE_MASTER)
        .next()
        .map(|r| resolve_path(main, &r.target))
        .ok_or_else(|| anyhow!("Template has no slide master"))?;
    let master_rels = package.relationships(&master)?;
    let xml = package.read_xml(&master)?;

    let mut layouts = Vec::new();
    let mut reader = Reader::from_str(&xml);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.name().local_name().as_ref() == b"sldLayoutId" =>
            {
                let rid = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.local_name().as_ref() == b"id" && a.key.prefix().is_some())
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                if let Some(rel) = rid.as_deref().and_then(|id| master_rels.get(id)) {
                    if rel.rel_type == REL_SLIDE_LAYOUT {
                        layouts.push(resolve_path(&master, &rel.target));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("Invalid slide master XML: {}", e)),
            _ => {}
        }
    }

    if layouts.is_empty() {
        layouts = master_rels
            .of_type(REL_SLIDE_LAYOUT)
            .map(|r| resolve_path(&master, &r.target))
            .collect();
    }
    Ok(layouts)
}

/// Appends slides to a package whose slide list has been cleared.
struct SlideBuilder<'a> {
    package: &'a mut OoxmlPackage,
    main: String,
    slide_rel_ids: Vec<String>,
    media: HashMap<PathBuf, String>,
}

impl<'a> SlideBuilder<'a> {
    fn new(package: &'a mut OoxmlPackage, main: &str) -> Self {
        Self {
            package,
            main: main.to_string(),
            slide_rel_ids: Vec::new(),
            media: HashMap::new(),
        }
    }

    fn add(
        &mut self,
        layout_part: &str,
        layout: &LayoutPlaceholders,
        title: &str,
        body: &str,
        overlays: &[OverlayImage],
    ) -> Result<()> {
        let number = self.slide_rel_ids.len() + 1;
        let part = format!("ppt/slides/slide{}.xml", number);

        let mut rels = Relationships::default();
        rels.push(REL_SLIDE_LAYOUT, relative_target(&part, layout_part));

        let mut pictures = Vec::new();
        for overlay in overlays {
            let Some(media_part) = self.media_part(overlay)? else {
                continue;
            };
            let rel_id = rels.push(REL_IMAGE, relative_target(&part, &media_part));
            pictures.push(PictureShape {
                rel_id,
                name: format!("Picture {}", pictures.len() + 1),
                left: overlay.left,
                top: overlay.top,
                width: overlay.width,
                height: overlay.height,
            });
        }

        self.package
            .put(part.as_str(), slide::slide_xml(layout, title, body, &pictures));
        self.package.put_relationships(&part, &rels);

        let mut types = self.package.content_types()?;
        types.set_override(&part, SLIDE_CONTENT_TYPE);
        self.package.put_content_types(&types);

        let mut main_rels = self.package.relationships(&self.main)?;
        let rel_id = main_rels.push(REL_SLIDE, relative_target(&self.main, &part));
        self.package.put_relationships(&self.main, &main_rels);
        self.slide_rel_ids.push(rel_id);
        Ok(())
    }

    /// Media part holding the overlay image, added once per source file.
    /// `None` when the file cannot be used.
    fn media_part(&mut self, overlay: &OverlayImage) -> Result<Option<String>> {
        if let Some(part) = self.media.get(&overlay.path) {
            return Ok(Some(part.clone()));
        }

        let extension = overlay
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let Some(content_type) = image_content_type(&extension) else {
            tracing::warn!(path = %overlay.path.display(), "Unsupported overlay image format, skipping");
            return Ok(None);
        };
        let bytes = match std::fs::read(&overlay.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %overlay.path.display(), error = %e, "Overlay image not found, skipping");
                return Ok(None);
            }
        };

        let mut n = self.media.len() + 1;
        let mut part = format!("ppt/media/deckforge-image{}.{}", n, extension);
        while self.package.contains(&part) {
            n += 1;
            part = format!("ppt/media/deckforge-image{}.{}", n, extension);
        }
        self.package.put(part.as_str(), bytes);

        let mut types = self.package.content_types()?;
        types.add_default(&extension, content_type);
        self.package.put_content_types(&types);

        self.media.insert(overlay.path.clone(), part.clone());
        Ok(Some(part))
    }

    fn finish(self) -> Result<()> {
        let xml = self.package.read_xml(&self.main)?;
        self.package
            .put(self.main.as_str(), slide::replace_slide_list(&xml, &self.slide_rel_ids)?);
        update_slide_count(self.package, self.slide_rel_ids.len())
    }
}

fn image_content_type(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// Keep `docProps/app.xml` in step with the slide count when the template has one.
fn update_slide_count(package: &mut OoxmlPackage, count: usize) -> Result<()> {
    const APP_PART: &str = "docProps/app.xml";
    if !package.contains(APP_PART) {
        return Ok(());
    }
    let slides = Regex::new(r"<Slides>\d+</Slides>").context("Failed to compile slide count regex")?;
    let xml = package.read_xml(APP_PART)?;
    let updated = slides.replace(&xml, format!("<Slides>{}</Slides>", count).as_str());
    package.put(APP_PART, updated.into_owned());
    Ok(())
}
