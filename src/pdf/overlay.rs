//! Title and watermark overlays
//!
//! An overlay is rendered as its own one-page document and then composited
//! onto a target page: the overlay's content streams are appended after the
//! page's own content and its resources are merged into the page's resources.
//! The page's original content is wrapped in `q`/`Q` first so any
//! transformation it leaves behind cannot displace the overlay.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::assets::TitleImage;
use crate::error::{Error, Result};
use crate::layout::{
    title_layout, watermark_anchor, Anchor, PageGeometry, WATERMARK_FONT_SIZE,
};
use crate::pdf::assemble::DocumentBuilder;
use crate::pdf::clone::{dereference, PageCloner};

/// Resource names used by overlays
///
/// Prefixed so they never collide with names already used by the page.
const TEXT_FONT: &str = "DxHelv";
const TITLE_FONT: &str = "DxHelvBold";
const WATERMARK_STATE: &str = "DxWatermarkGs";
const TITLE_IMAGE: &str = "DxTitleImage";

/// Watermark fill gray level (0 = black, 1 = white)
const WATERMARK_GRAY: f32 = 0.5;

/// Watermark fill opacity
const WATERMARK_OPACITY: f32 = 0.6;

/// Standard 14 fonts used for overlay text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayFont {
    Helvetica,
    HelveticaBold,
}

impl OverlayFont {
    fn base_font(self) -> &'static str {
        match self {
            OverlayFont::Helvetica => "Helvetica",
            OverlayFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            OverlayFont::Helvetica => &HELVETICA_WIDTHS,
            OverlayFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }
}

/// Helvetica glyph widths for characters 32-126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space - /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0 - 9
    278, 278, 584, 584, 584, 556, 1015, // : - @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A - M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N - Z
    278, 278, 278, 469, 556, 333, // [ - `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a - m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n - z
    334, 260, 334, 584, // { - ~
];

/// Helvetica-Bold glyph widths for characters 32-126, in 1/1000 em
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // space - /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0 - 9
    333, 333, 584, 584, 584, 611, 975, // : - @
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A - M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N - Z
    333, 278, 333, 584, 556, 333, // [ - `
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a - m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n - z
    389, 280, 389, 584, // { - ~
];

/// Width used for characters outside the ASCII table
const FALLBACK_WIDTH: u16 = 556;

/// Encode text for a WinAnsiEncoding font
///
/// Latin-1 characters map directly; anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ (32..=126 | 160..=255) => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Width of `text` in points at `font_size`
pub fn text_width(text: &str, font: OverlayFont, font_size: f32) -> f32 {
    let widths = font.widths();
    let units: u32 = encode_win_ansi(text)
        .into_iter()
        .map(|byte| match byte {
            32..=126 => widths[(byte - 32) as usize] as u32,
            _ => FALLBACK_WIDTH as u32,
        })
        .sum();
    units as f32 * font_size / 1000.0
}

/// Escape encoded bytes as a PDF literal string
///
/// Bytes outside printable ASCII are written as octal escapes so the content
/// stream itself stays ASCII.
fn pdf_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('(');
    for &byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            32..=126 => out.push(byte as char),
            _ => out.push_str(&format!("\\{:03o}", byte)),
        }
    }
    out.push(')');
    out
}

/// Text matrix placing text at an anchor, turned by the anchor's angle
fn text_matrix(anchor: &Anchor) -> String {
    let (a, b, c, d) = match anchor.angle {
        90 => (0, 1, -1, 0),
        180 => (-1, 0, 0, -1),
        270 => (0, -1, 1, 0),
        _ => (1, 0, 0, 1),
    };
    format!("{} {} {} {} {:.2} {:.2} Tm\n", a, b, c, d, anchor.x, anchor.y)
}

/// Traceability label stamped on original pages
pub fn watermark_text(original_page_number: u32, file_name: &str) -> String {
    format!("P{} | {}", original_page_number, file_name)
}

/// What an overlay should show
#[derive(Debug, Clone, Copy)]
pub enum OverlayContent<'a> {
    /// Title page text with an optional image below it
    Title { text: &'a str, image: Option<&'a TitleImage> },
    /// Page number and source file label
    ///
    /// `page_rotate` is the page's final `/Rotate`, including any turn added
    /// for the even stack. A page number of 0 marks a synthetic page and
    /// renders no text.
    Watermark { original_page_number: u32, file_name: &'a str, page_rotate: i64 },
}

/// A rendered overlay: a standalone one-page document
#[derive(Debug)]
pub struct Overlay {
    pub doc: Document,
    pub page_id: ObjectId,
}

impl Overlay {
    /// Decoded content of the overlay page
    pub fn content(&self) -> Result<Vec<u8>> {
        Ok(self.doc.get_page_content(self.page_id)?)
    }
}

/// Render an overlay for a page of the given geometry
pub fn render(geometry: &PageGeometry, content: OverlayContent<'_>) -> Result<Overlay> {
    let mut builder = DocumentBuilder::new();
    let page_id = builder.new_blank_page(geometry);

    let (operators, resources) = match content {
        OverlayContent::Title { text, image } => render_title(builder.doc_mut(), geometry, text, image),
        OverlayContent::Watermark { original_page_number, file_name, page_rotate } => {
            render_watermark(builder.doc_mut(), geometry, original_page_number, file_name, page_rotate)
        }
    };

    let content_id = builder
        .doc_mut()
        .add_object(Stream::new(Dictionary::new(), operators.into_bytes()));
    let page = builder.doc_mut().get_dictionary_mut(page_id)?;
    page.set("Contents", Object::Reference(content_id));
    page.set("Resources", Object::Dictionary(resources));

    builder.push_page(page_id)?;
    Ok(Overlay { doc: builder.finish(), page_id })
}

fn font_object(doc: &mut Document, font: OverlayFont) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    })
}

fn render_watermark(
    doc: &mut Document,
    geometry: &PageGeometry,
    original_page_number: u32,
    file_name: &str,
    page_rotate: i64,
) -> (String, Dictionary) {
    let mut resources = Dictionary::new();
    if original_page_number == 0 {
        return (String::new(), resources);
    }

    let text = watermark_text(original_page_number, file_name);
    let width = text_width(&text, OverlayFont::Helvetica, WATERMARK_FONT_SIZE);
    let anchor = watermark_anchor(geometry, page_rotate, width);

    let font_id = font_object(doc, OverlayFont::Helvetica);
    resources.set("Font", dictionary! { TEXT_FONT => font_id });
    resources.set(
        "ExtGState",
        dictionary! {
            WATERMARK_STATE => dictionary! {
                "Type" => "ExtGState",
                "ca" => WATERMARK_OPACITY,
                "CA" => WATERMARK_OPACITY,
            },
        },
    );

    let mut content = String::new();
    content.push_str("q\n");
    content.push_str(&format!("/{} gs\n", WATERMARK_STATE));
    content.push_str(&format!("{} g\n", WATERMARK_GRAY));
    content.push_str("BT\n");
    content.push_str(&format!("/{} {} Tf\n", TEXT_FONT, WATERMARK_FONT_SIZE));
    content.push_str(&text_matrix(&anchor));
    content.push_str(&format!("{} Tj\n", pdf_literal(&encode_win_ansi(&text))));
    content.push_str("ET\n");
    content.push_str("Q\n");

    (content, resources)
}

fn render_title(
    doc: &mut Document,
    geometry: &PageGeometry,
    text: &str,
    image: Option<&TitleImage>,
) -> (String, Dictionary) {
    let em_width = text_width(text, OverlayFont::HelveticaBold, 1.0);
    let layout = title_layout(geometry, em_width, image.map(|img| (img.width, img.height)));

    let mut resources = Dictionary::new();
    let mut content = String::new();

    if let (Some(image), Some(placement)) = (image, layout.image) {
        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        };
        if let Some(alpha) = &image.alpha {
            let smask_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width as i64,
                    "Height" => image.height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8i64,
                },
                alpha.clone(),
            ));
            image_dict.set("SMask", Object::Reference(smask_id));
        }
        let image_id = doc.add_object(Stream::new(image_dict, image.rgb.clone()));
        resources.set("XObject", dictionary! { TITLE_IMAGE => image_id });

        content.push_str("q\n");
        content.push_str(&format!(
            "{:.2} 0 0 {:.2} {:.2} {:.2} cm\n",
            placement.width, placement.height, placement.x, placement.y
        ));
        content.push_str(&format!("/{} Do\n", TITLE_IMAGE));
        content.push_str("Q\n");
    }

    let font_id = font_object(doc, OverlayFont::HelveticaBold);
    resources.set("Font", dictionary! { TITLE_FONT => font_id });

    content.push_str("q\n");
    content.push_str("0 g\n");
    content.push_str("BT\n");
    content.push_str(&format!("/{} {:.2} Tf\n", TITLE_FONT, layout.font_size));
    content.push_str(&text_matrix(&layout.text));
    content.push_str(&format!("{} Tj\n", pdf_literal(&encode_win_ansi(text))));
    content.push_str("ET\n");
    content.push_str("Q\n");

    (content, resources)
}

/// Composite `overlay` onto page `page_id` of `target`
///
/// The target page must already be a clone owned by `target`; the overlay's
/// objects are copied in and the overlay document is left untouched.
pub fn merge(target: &mut Document, page_id: ObjectId, overlay: &Overlay) -> Result<()> {
    let overlay_page = overlay.doc.get_dictionary(overlay.page_id)?;
    let mut cloner = PageCloner::new();

    let content_refs = match overlay_page.get(b"Contents") {
        Ok(contents) => match cloner.import_object(&overlay.doc, contents, target)? {
            Object::Array(items) => items,
            other => vec![other],
        },
        Err(_) => Vec::new(),
    };
    let resources = match overlay_page.get(b"Resources") {
        Ok(res) => cloner.import_object(&overlay.doc, res, target)?,
        Err(_) => Object::Dictionary(Dictionary::new()),
    };

    wrap_page_content_in_graphics_state(target, page_id)?;
    for content_ref in content_refs {
        let content_id = match content_ref {
            Object::Reference(id) => id,
            other => target.add_object(other),
        };
        append_content_to_page(target, page_id, content_id)?;
    }
    merge_resources(target, page_id, &resources)
}

/// Resolve a dictionary that may be stored inline or behind a reference
fn owned_dictionary(doc: &Document, object: &Object) -> Dictionary {
    match dereference(doc, object) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    }
}

/// Merge overlay resources into the page's resources dictionary
///
/// The merged dictionary is stored inline on the page, so a resources object
/// shared with other pages is never modified.
fn merge_resources(doc: &mut Document, page_id: ObjectId, overlay_resources: &Object) -> Result<()> {
    let page_resources = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Resources") {
            Ok(res) => owned_dictionary(doc, res),
            Err(_) => Dictionary::new(),
        }
    };
    let overlay_dict = owned_dictionary(doc, overlay_resources);

    let mut merged = page_resources;
    for (key, value) in overlay_dict.iter() {
        let existing = merged.get(key).ok().cloned();
        match (existing, value) {
            // Both have this resource category (Font, XObject, ...): merge entries
            (Some(existing), Object::Dictionary(additions)) => {
                let mut category = owned_dictionary(doc, &existing);
                for (name, resource) in additions.iter() {
                    category.set(name.clone(), resource.clone());
                }
                merged.set(key.clone(), Object::Dictionary(category));
            }
            // Category missing on the page, or not a dictionary (ProcSet): overlay wins
            _ => merged.set(key.clone(), value.clone()),
        }
    }

    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Dictionary(merged));
    Ok(())
}

/// Content stream ids of a page, moving inline streams into objects
fn page_content_ids(doc: &mut Document, page_id: ObjectId) -> Result<Vec<ObjectId>> {
    let contents = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();
    let items = match contents {
        Some(Object::Array(items)) => items,
        Some(other) => vec![other],
        None => Vec::new(),
    };

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Object::Reference(id) => ids.push(id),
            Object::Stream(stream) => ids.push(doc.add_object(stream)),
            _ => {}
        }
    }
    Ok(ids)
}

/// Wrap page content streams in q/Q to isolate transformations
///
/// Rather than rewriting the page's streams, a `q` stream is prepended and a
/// `Q` stream appended; the original streams stay byte-for-byte intact.
fn wrap_page_content_in_graphics_state(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let existing = page_content_ids(doc, page_id)?;
    if existing.is_empty() {
        return Ok(());
    }

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(Object::Reference(restore_id));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Append a content stream to a page's Contents
///
/// Appended content draws on top of the page (not covered by background fills).
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let mut contents: Vec<Object> = page_content_ids(doc, page_id)?
        .into_iter()
        .map(Object::Reference)
        .collect();
    contents.push(Object::Reference(new_content_id));

    let page = doc
        .get_object_mut(page_id)?
        .as_dict_mut()
        .map_err(|_| Error::General(format!("Object {:?} is not a page dictionary", page_id)))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_string(overlay: &Overlay) -> String {
        String::from_utf8(overlay.content().unwrap()).unwrap()
    }

    #[test]
    fn test_text_width_uses_font_metrics() {
        // "Hi" = H(722) + i(222) in Helvetica
        assert!((text_width("Hi", OverlayFont::Helvetica, 10.0) - 9.44).abs() < 0.001);
        // Bold "Hi" = 722 + 278
        assert!((text_width("Hi", OverlayFont::HelveticaBold, 1.0) - 1.0).abs() < 0.001);
        assert_eq!(text_width("", OverlayFont::Helvetica, 12.0), 0.0);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Aé"), vec![b'A', 0xE9]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn test_pdf_literal_escapes() {
        assert_eq!(pdf_literal(b"a(b)c\\"), "(a\\(b\\)c\\\\)");
        assert_eq!(pdf_literal(&[0xE9]), "(\\351)");
    }

    #[test]
    fn test_watermark_text_format() {
        assert_eq!(watermark_text(2, "file.pdf"), "P2 | file.pdf");
    }

    #[test]
    fn test_upright_watermark_content() {
        let overlay = render(
            &PageGeometry::letter(),
            OverlayContent::Watermark { original_page_number: 7, file_name: "a.pdf", page_rotate: 0 },
        )
        .unwrap();
        let content = content_string(&overlay);

        assert!(content.contains("(P7 | a.pdf) Tj"));
        assert!(content.contains("1 0 0 1 "));
        assert!(content.contains("/DxWatermarkGs gs"));
    }

    #[test]
    fn test_flipped_watermark_uses_rotated_text_matrix() {
        let overlay = render(
            &PageGeometry::letter(),
            OverlayContent::Watermark { original_page_number: 4, file_name: "a.pdf", page_rotate: 180 },
        )
        .unwrap();
        let content = content_string(&overlay);

        assert!(content.contains("-1 0 0 -1 "));
        assert!(content.contains(" 774.00 Tm"));
    }

    #[test]
    fn test_quarter_turned_watermark_matrix() {
        let overlay = render(
            &PageGeometry::letter(),
            OverlayContent::Watermark { original_page_number: 4, file_name: "a.pdf", page_rotate: 90 },
        )
        .unwrap();
        assert!(content_string(&overlay).contains("0 1 -1 0 594.00 "));

        let overlay = render(
            &PageGeometry::letter(),
            OverlayContent::Watermark { original_page_number: 4, file_name: "a.pdf", page_rotate: 270 },
        )
        .unwrap();
        assert!(content_string(&overlay).contains("0 -1 1 0 18.00 "));
    }

    #[test]
    fn test_synthetic_page_gets_no_watermark_text() {
        let overlay = render(
            &PageGeometry::letter(),
            OverlayContent::Watermark { original_page_number: 0, file_name: "a.pdf", page_rotate: 0 },
        )
        .unwrap();
        assert!(!content_string(&overlay).contains("Tj"));
    }

    #[test]
    fn test_title_with_and_without_image() {
        let text_only = render(&PageGeometry::letter(), OverlayContent::Title { text: "Report", image: None }).unwrap();
        let content = content_string(&text_only);
        assert!(content.contains("(Report) Tj"));
        assert!(!content.contains("Do"));

        let image = TitleImage { width: 2, height: 1, rgb: vec![255, 0, 0, 0, 0, 255], alpha: None };
        let with_image = render(
            &PageGeometry::letter(),
            OverlayContent::Title { text: "Report", image: Some(&image) },
        )
        .unwrap();
        let content = content_string(&with_image);
        assert!(content.contains("/DxTitleImage Do"));
        assert!(content.contains("(Report) Tj"));
    }

    #[test]
    fn test_transparent_title_image_gets_soft_mask() {
        let image = TitleImage { width: 2, height: 1, rgb: vec![0; 6], alpha: Some(vec![0, 255]) };
        let overlay = render(
            &PageGeometry::letter(),
            OverlayContent::Title { text: "Logo", image: Some(&image) },
        )
        .unwrap();

        let page = overlay.doc.get_dictionary(overlay.page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(TITLE_IMAGE.as_bytes()).unwrap().as_reference().unwrap();
        let image_stream = overlay.doc.get_object(image_id).unwrap().as_stream().unwrap();
        let smask_id = image_stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let smask = overlay.doc.get_object(smask_id).unwrap().as_stream().unwrap();

        assert_eq!(smask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
        assert_eq!(smask.content, vec![0, 255]);
    }

    #[test]
    fn test_merge_appends_content_and_keeps_page_resources() {
        let mut builder = DocumentBuilder::new();
        let original = builder.doc_mut().add_object(Stream::new(
            Dictionary::new(),
            b"BT /F1 12 Tf 72 720 Td (Body) Tj ET".to_vec(),
        ));
        let font_id = builder.doc_mut().add_object(dictionary! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Times-Roman",
        });
        let page_id = builder.doc_mut().add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => original,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        builder.push_page(page_id).unwrap();
        let mut doc = builder.finish();

        let overlay = render(
            &PageGeometry::letter(),
            OverlayContent::Watermark { original_page_number: 3, file_name: "x.pdf", page_rotate: 0 },
        )
        .unwrap();
        merge(&mut doc, page_id, &overlay).unwrap();

        let content = String::from_utf8(doc.get_page_content(page_id).unwrap()).unwrap();
        let body = content.find("(Body) Tj").unwrap();
        let stamp = content.find("(P3 | x.pdf) Tj").unwrap();
        assert!(content.trim_start().starts_with('q'));
        assert!(body < stamp);

        let resources = doc.get_dictionary(page_id).unwrap().get(b"Resources").unwrap().as_dict().unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(TEXT_FONT.as_bytes()));
        assert!(resources.has(b"ExtGState"));
    }
}
