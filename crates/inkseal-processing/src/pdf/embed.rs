//! Signature stamping.
//!
//! The PNG is split into an RGB image XObject plus a DeviceGray soft mask so transparent
//! strokes stay transparent. The existing page content is wrapped in `q ... Q` so its
//! graphics state cannot leak into the stamp, then the stamp is drawn last.

use image::ImageFormat;
use inkseal_core::constants::SIGNATURE_TARGET_PAGE;
use inkseal_core::models::{ScreenPlacement, SignaturePlacement};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::{first_page, load, map_to_page_space, page_dict, page_geometry, PdfError};

/// New PDF bytes plus where the signature landed.
#[derive(Debug, Clone)]
pub struct SignedPdf {
    pub bytes: Vec<u8>,
    pub placement: SignaturePlacement,
}

/// Stamp `signature_png` onto the first page of `pdf` at `screen`.
///
/// Never mutates `pdf`; the result is a wholly new byte stream.
pub fn embed_signature(
    pdf: &[u8],
    signature_png: &[u8],
    screen: &ScreenPlacement,
) -> Result<SignedPdf, PdfError> {
    let mut doc = load(pdf)?;
    let (page_number, page_id) = first_page(&doc)?;
    debug_assert_eq!(page_number, SIGNATURE_TARGET_PAGE);

    let geometry = page_geometry(&doc, page_id)?;
    let rect = map_to_page_space(screen, &geometry)?;

    let image_id = add_signature_image(&mut doc, signature_png)?;
    let name = register_xobject(&mut doc, page_id, image_id)?;

    let draw = format!(
        "Q\nq {} 0 0 {} {} {} cm /{} Do Q\n",
        fmt_num(rect.width),
        fmt_num(rect.height),
        fmt_num(rect.x),
        fmt_num(rect.y),
        name
    );
    wrap_page_contents(&mut doc, page_id, draw.into_bytes())?;

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PdfError::InvalidDocument(format!("failed to serialize PDF: {}", e)))?;

    tracing::debug!(
        page = page_number,
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        size_bytes = bytes.len(),
        "Signature embedded"
    );

    Ok(SignedPdf {
        bytes,
        placement: SignaturePlacement::on_page(page_number, rect),
    })
}

/// Content stream numbers: plain decimal, no exponent.
fn fmt_num(value: f64) -> String {
    let s = format!("{:.4}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn add_signature_image(doc: &mut Document, png: &[u8]) -> Result<ObjectId, PdfError> {
    let img = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| PdfError::InvalidSignatureImage(e.to_string()))?
        .to_rgba8();
    let (img_w, img_h) = img.dimensions();
    if img_w == 0 || img_h == 0 {
        return Err(PdfError::InvalidSignatureImage(
            "image has no pixels".to_string(),
        ));
    }

    let mut rgb = Vec::with_capacity((img_w * img_h * 3) as usize);
    let mut alpha = Vec::with_capacity((img_w * img_h) as usize);
    for pixel in img.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut smask = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    );
    // Raw pixels compress well; fall back to uncompressed on failure.
    let _ = smask.compress();
    let smask_id = doc.add_object(smask);

    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    );
    let _ = image.compress();
    Ok(doc.add_object(image))
}

enum ResourcesAt {
    Page,
    Object(ObjectId),
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PdfError> {
    doc.get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| PdfError::InvalidDocument("page object is not a dictionary".to_string()))
}

/// First `Resources` dictionary found walking up from the page, resolved.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, PdfError> {
    let mut current = page_dict(doc, page_id)?
        .get(b"Parent")
        .and_then(|p| p.as_reference())
        .ok();
    let mut depth = 0;
    while let Some(id) = current {
        depth += 1;
        if depth > 64 {
            break;
        }
        let dict = page_dict(doc, id)?;
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(res)) => return Ok(res.clone()),
            Ok(Object::Reference(res_id)) => {
                if let Ok(res) = doc.get_object(*res_id).and_then(|o| o.as_dict()) {
                    return Ok(res.clone());
                }
            }
            _ => {}
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Ok(Dictionary::new())
}

fn locate_resources(doc: &mut Document, page_id: ObjectId) -> Result<ResourcesAt, PdfError> {
    let existing = match page_dict(doc, page_id)?.get(b"Resources") {
        Ok(Object::Reference(id)) => Some(ResourcesAt::Object(*id)),
        Ok(Object::Dictionary(_)) => Some(ResourcesAt::Page),
        Ok(_) => {
            return Err(PdfError::InvalidDocument(
                "page resources are not a dictionary".to_string(),
            ))
        }
        Err(_) => None,
    };

    match existing {
        Some(at) => Ok(at),
        None => {
            // Copy inherited resources onto the page so fonts etc. keep resolving.
            let inherited = inherited_resources(doc, page_id)?;
            page_dict_mut(doc, page_id)?.set("Resources", inherited);
            Ok(ResourcesAt::Page)
        }
    }
}

fn resources_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
    at: &ResourcesAt,
) -> Result<&'a mut Dictionary, PdfError> {
    match at {
        ResourcesAt::Object(id) => doc
            .get_object_mut(*id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|_| {
                PdfError::InvalidDocument("page resources are not a dictionary".to_string())
            }),
        ResourcesAt::Page => match page_dict_mut(doc, page_id)?.get_mut(b"Resources") {
            Ok(Object::Dictionary(dict)) => Ok(dict),
            _ => Err(PdfError::InvalidDocument(
                "page resources are not a dictionary".to_string(),
            )),
        },
    }
}

/// Add `image_id` under a name not yet used by the page and return that name.
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    image_id: ObjectId,
) -> Result<String, PdfError> {
    let at = locate_resources(doc, page_id)?;

    let xobject_ref = match resources_mut(doc, page_id, &at)?.get(b"XObject") {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(Object::Dictionary(_)) | Err(_) => None,
        Ok(_) => {
            return Err(PdfError::InvalidDocument(
                "XObject resources are not a dictionary".to_string(),
            ))
        }
    };

    let xobjects: &mut Dictionary = match xobject_ref {
        Some(id) => doc
            .get_object_mut(id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|_| {
                PdfError::InvalidDocument("XObject resources are not a dictionary".to_string())
            })?,
        None => {
            let resources = resources_mut(doc, page_id, &at)?;
            if !resources.has(b"XObject") {
                resources.set("XObject", Dictionary::new());
            }
            match resources.get_mut(b"XObject") {
                Ok(Object::Dictionary(dict)) => dict,
                _ => {
                    return Err(PdfError::InvalidDocument(
                        "XObject resources are not a dictionary".to_string(),
                    ))
                }
            }
        }
    };

    let mut n = 0u32;
    let name = loop {
        let candidate = format!("InksealSig{}", n);
        if !xobjects.has(candidate.as_bytes()) {
            break candidate;
        }
        n += 1;
    };
    xobjects.set(name.as_bytes().to_vec(), image_id);
    Ok(name)
}

/// Replace the page's content with `[q, <existing...>, tail]`; `tail` starts with `Q`.
fn wrap_page_contents(
    doc: &mut Document,
    page_id: ObjectId,
    tail: Vec<u8>,
) -> Result<(), PdfError> {
    let existing: Vec<Object> = match page_dict(doc, page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Stream(_)) => vec![Object::Reference(*id)],
            _ => {
                return Err(PdfError::InvalidDocument(
                    "page contents are not a stream".to_string(),
                ))
            }
        },
        Ok(Object::Array(items)) => items.clone(),
        Ok(_) => {
            return Err(PdfError::InvalidDocument(
                "page contents are not a stream".to_string(),
            ))
        }
        Err(_) => Vec::new(),
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let tail_id = doc.add_object(Stream::new(Dictionary::new(), tail));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(tail_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}
