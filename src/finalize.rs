//! Post-processing of the rendered PDF with `lopdf`.
//!
//! The backend stamps every file with creation dates, an XMP packet and a
//! random document ID. This pass replaces the `/Info` dictionary with the
//! configured metadata, drops the XMP packet, derives `/ID` from the content
//! and adds an outline for headings, so identical input gives identical bytes.
//!
//! It also paints the filled rectangles and sized rules that the drawing
//! backend cannot express, and shares one copy of each embedded font program
//! between the font variants that load the same file.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use log::warn;
use sha2::{Digest, Sha256};

use crate::config::Metadata;
use crate::style::Color;

/// A top-level bookmark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineEntry {
    /// Text shown in the viewer's outline.
    pub title: String,
    /// Zero-based target page.
    pub page: usize,
}

/// Vector graphics painted beneath a page's text, in PDF user space (points,
/// origin at the bottom-left corner of the page).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// A filled rectangle given by its lower-left corner.
    Fill {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
    },
    /// A straight stroke.
    Line {
        from: (f64, f64),
        to: (f64, f64),
        width: f64,
        color: Color,
    },
}

/// Applies metadata, outline and a deterministic ID to `pdf`, and paints
/// `page_shapes[i]` beneath the content of page `i`.
pub fn finalize(
    pdf: &[u8],
    metadata: &Metadata,
    outlines: &[OutlineEntry],
    page_shapes: &[Vec<Shape>],
) -> Result<Vec<u8>, lopdf::Error> {
    let mut document = Document::load_mem(pdf)?;

    paint_shapes(&mut document, page_shapes)?;
    share_font_programs(&mut document);
    replace_info(&mut document, metadata);
    strip_xmp_metadata(&mut document)?;
    if !outlines.is_empty() {
        add_outlines(&mut document, outlines)?;
    }

    document.trailer.remove(b"ID");
    let mut draft = Vec::new();
    document.save_to(&mut draft)?;
    let digest = Sha256::digest(&draft);
    let id = Object::String(digest[..16].to_vec(), StringFormat::Hexadecimal);
    document
        .trailer
        .set("ID", Object::Array(vec![id.clone(), id]));

    let mut bytes = Vec::new();
    document.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Encodes `text` as a PDF text string: literal for ASCII, UTF-16BE otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::string_literal(text)
    } else {
        let mut bytes = vec![0xfe, 0xff];
        bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

fn replace_info(document: &mut Document, metadata: &Metadata) {
    let mut info = Dictionary::new();
    let fields = [
        ("Title", Some(&metadata.title)),
        ("Author", Some(&metadata.author)),
        ("Creator", Some(&metadata.creator)),
        ("Subject", Some(&metadata.subject)),
        ("Producer", metadata.producer.as_ref()),
    ];
    for (key, value) in fields {
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            info.set(key, text_string(value));
        }
    }

    match document
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
    {
        Ok(id) => {
            document.objects.insert(id, Object::Dictionary(info));
        }
        Err(_) => {
            let id = document.add_object(Object::Dictionary(info));
            document.trailer.set("Info", Object::Reference(id));
        }
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn color_operands(color: Color) -> Vec<Object> {
    [color.r, color.g, color.b]
        .into_iter()
        .map(|channel| real(f64::from(channel) / 255.0))
        .collect()
}

fn shape_operations(shapes: &[Shape]) -> Vec<Operation> {
    let mut operations = vec![Operation::new("q", vec![])];
    for shape in shapes {
        match *shape {
            Shape::Fill {
                x,
                y,
                width,
                height,
                color,
            } => {
                operations.push(Operation::new("rg", color_operands(color)));
                operations.push(Operation::new(
                    "re",
                    vec![real(x), real(y), real(width), real(height)],
                ));
                operations.push(Operation::new("f", vec![]));
            }
            Shape::Line {
                from,
                to,
                width,
                color,
            } => {
                operations.push(Operation::new("w", vec![real(width)]));
                operations.push(Operation::new("RG", color_operands(color)));
                operations.push(Operation::new("m", vec![real(from.0), real(from.1)]));
                operations.push(Operation::new("l", vec![real(to.0), real(to.1)]));
                operations.push(Operation::new("S", vec![]));
            }
        }
    }
    operations.push(Operation::new("Q", vec![]));
    operations
}

/// Puts a stream with the shapes of each page in front of its existing content.
fn paint_shapes(document: &mut Document, page_shapes: &[Vec<Shape>]) -> Result<(), lopdf::Error> {
    let pages = document.get_pages();
    for (index, shapes) in page_shapes.iter().enumerate() {
        if shapes.is_empty() {
            continue;
        }
        let page_number = u32::try_from(index + 1).unwrap_or(u32::MAX);
        let Some(page_id) = pages.get(&page_number).copied() else {
            warn!("shapes for missing page {index} dropped");
            continue;
        };

        let content = Content {
            operations: shape_operations(shapes),
        };
        let mut stream = Stream::new(Dictionary::new(), content.encode()?);
        stream.compress()?;
        let stream_id = document.add_object(stream);

        let page = document.get_object_mut(page_id)?.as_dict_mut()?;
        let contents = match page.remove(b"Contents") {
            Some(Object::Array(mut existing)) => {
                existing.insert(0, Object::Reference(stream_id));
                Object::Array(existing)
            }
            Some(existing) => Object::Array(vec![Object::Reference(stream_id), existing]),
            None => Object::Reference(stream_id),
        };
        page.set("Contents", contents);
    }
    Ok(())
}

/// Points every font descriptor at a single copy of each distinct
/// `/FontFile2` program and drops the copies.
fn share_font_programs(document: &mut Document) {
    let mut programs: Vec<(ObjectId, ObjectId)> = Vec::new();
    for (id, object) in &document.objects {
        if let Ok(descriptor) = object.as_dict() {
            if let Ok(program) = descriptor.get(b"FontFile2").and_then(Object::as_reference) {
                programs.push((*id, program));
            }
        }
    }

    let mut canonical: BTreeMap<Vec<u8>, ObjectId> = BTreeMap::new();
    let mut duplicates = Vec::new();
    for (descriptor, program) in programs {
        let Ok(stream) = document.get_object(program).and_then(Object::as_stream) else {
            continue;
        };
        let digest = Sha256::digest(&stream.content).to_vec();
        match canonical.get(&digest) {
            Some(&kept) if kept != program => duplicates.push((descriptor, program, kept)),
            Some(_) => {}
            None => {
                canonical.insert(digest, program);
            }
        }
    }

    for (descriptor, program, kept) in duplicates {
        if let Ok(dictionary) = document
            .get_object_mut(descriptor)
            .and_then(Object::as_dict_mut)
        {
            dictionary.set("FontFile2", Object::Reference(kept));
        }
        document.objects.remove(&program);
    }
}

fn catalog_id(document: &Document) -> Result<ObjectId, lopdf::Error> {
    document.trailer.get(b"Root").and_then(Object::as_reference)
}

fn strip_xmp_metadata(document: &mut Document) -> Result<(), lopdf::Error> {
    let root = catalog_id(document)?;
    let removed = document.get_object_mut(root)?.as_dict_mut()?.remove(b"Metadata");
    if let Some(Object::Reference(id)) = removed {
        document.objects.remove(&id);
    }
    Ok(())
}

fn add_outlines(document: &mut Document, entries: &[OutlineEntry]) -> Result<(), lopdf::Error> {
    let pages = document.get_pages();
    let root = catalog_id(document)?;
    let outlines_id = document.new_object_id();

    let mut targets = Vec::with_capacity(entries.len());
    for entry in entries {
        let page_number = u32::try_from(entry.page + 1).unwrap_or(u32::MAX);
        // Entries pointing past the last page are skipped rather than failing the render.
        if let Some(page_ref) = pages.get(&page_number).copied() {
            targets.push((document.new_object_id(), page_ref, entry));
        }
    }
    if targets.is_empty() {
        return Ok(());
    }

    for (index, (object_id, page_ref, entry)) in targets.iter().enumerate() {
        let mut dictionary = Dictionary::new();
        dictionary.set("Title", text_string(&entry.title));
        dictionary.set(
            "Dest",
            Object::Array(vec![Object::Reference(*page_ref), Object::Name(b"Fit".to_vec())]),
        );
        dictionary.set("Parent", Object::Reference(outlines_id));
        if index > 0 {
            dictionary.set("Prev", Object::Reference(targets[index - 1].0));
        }
        if let Some(next) = targets.get(index + 1) {
            dictionary.set("Next", Object::Reference(next.0));
        }
        document
            .objects
            .insert(*object_id, Object::Dictionary(dictionary));
    }

    let mut root_outline = Dictionary::new();
    root_outline.set("Type", Object::Name(b"Outlines".to_vec()));
    root_outline.set("Count", Object::Integer(targets.len() as i64));
    root_outline.set("First", Object::Reference(targets[0].0));
    root_outline.set("Last", Object::Reference(targets[targets.len() - 1].0));
    document
        .objects
        .insert(outlines_id, Object::Dictionary(root_outline));

    let catalog = document.get_object_mut(root)?.as_dict_mut()?;
    catalog.set("Outlines", Object::Reference(outlines_id));
    catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
    Ok(())
}
