//! Small in-memory fixtures for PDF and signature tests.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

fn page_content(label: &str) -> Vec<u8> {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12i64.into()]),
            Operation::new("Td", vec![72i64.into(), 720i64.into()]),
            Operation::new("Tj", vec![Object::string_literal(label)]),
            Operation::new("ET", vec![]),
        ],
    };
    content.encode().unwrap_or_default()
}

fn build(
    page_count: u32,
    page_size: Option<(f64, f64)>,
    pages_size: Option<(f64, f64)>,
) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for n in 1..=page_count {
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            page_content(&format!("Page {}", n)),
        ));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if let Some((w, h)) = page_size {
            page.set("MediaBox", media_box(w, h));
        }
        kids.push(doc.add_object(page).into());
    }

    let mut pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "Resources" => resources_id,
    };
    if let Some((w, h)) = pages_size {
        pages.set("MediaBox", media_box(w, h));
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    finish(doc, pages_id)
}

fn media_box(w: f64, h: f64) -> Vec<Object> {
    vec![Object::Integer(0), Object::Integer(0), Object::Real(w as _), Object::Real(h as _)]
}

fn finish(mut doc: Document, pages_id: ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture PDF serializes");
    out
}

/// `n` pages, each with its own MediaBox of `w` x `h` points.
pub fn pdf_with_pages(n: u32, w: f64, h: f64) -> Vec<u8> {
    build(n, Some((w, h)), None)
}

/// Structurally valid PDF whose page tree is empty.
pub fn pdf_without_pages() -> Vec<u8> {
    build(0, None, None)
}

/// One page that inherits both MediaBox and Resources from the Pages node.
pub fn pdf_with_inherited_media_box(w: f64, h: f64) -> Vec<u8> {
    build(1, None, Some((w, h)))
}

/// One Letter page whose Resources reference a shared XObject dictionary.
pub fn pdf_with_referenced_xobjects() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let existing_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(10), Object::Integer(10)],
        },
        b"0 0 10 10 re f".to_vec(),
    ));
    let xobjects_id = doc.add_object(dictionary! { "Existing" => existing_id });
    let resources_id = doc.add_object(dictionary! { "XObject" => xobjects_id });
    let content_id = doc.add_object(Stream::new(Dictionary::new(), b"/Existing Do".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box(612.0, 792.0),
        "Resources" => resources_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1i64,
        }),
    );

    finish(doc, pages_id)
}

/// A small PNG with a transparent background and an opaque stroke.
pub fn signature_png() -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(40, 16, Rgba([0, 0, 0, 0]));
    for x in 2..38 {
        img.put_pixel(x, 8, Rgba([10, 20, 120, 255]));
    }
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("fixture PNG encodes");
    out.into_inner()
}

/// A valid image that is not a PNG.
pub fn signature_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg)
        .expect("fixture JPEG encodes");
    out.into_inner()
}
