//! Layer bounding boxes from OGC GetCapabilities documents.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::error::{FetchError, FetchResult};

/// Advertised extent of one layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerExtent {
    /// `CRS` (or `SRS`) attribute of the layer's first BoundingBox.
    pub crs: Option<String>,
    /// `minx,miny,maxx,maxy` as written in the document.
    pub bbox: String,
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> FetchResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| FetchError::Capabilities(e.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| FetchError::Capabilities(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn extent_of(element: &BytesStart<'_>) -> FetchResult<LayerExtent> {
    let mut corners = Vec::with_capacity(4);
    for name in [&b"minx"[..], b"miny", b"maxx", b"maxy"] {
        corners.push(attribute(element, name)?.unwrap_or_default());
    }
    let crs = match attribute(element, b"CRS")? {
        Some(crs) => Some(crs),
        None => attribute(element, b"SRS")?,
    };
    Ok(LayerExtent {
        crs,
        bbox: corners.join(","),
    })
}

/// Find the `Layer` named `layer_name` and read its BoundingBox.
///
/// Namespaces are ignored. Returns `Ok(None)` when no such layer (or no
/// bounding box for it) exists.
pub fn layer_extent(xml: &str, layer_name: &str) -> FetchResult<Option<LayerExtent>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    // One entry per open Layer: (name matched, extent found).
    let mut layers: Vec<(bool, Option<LayerExtent>)> = Vec::new();
    let mut in_name = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Layer" => layers.push((false, None)),
                b"Name" => in_name = true,
                b"BoundingBox" => record_extent(&mut layers, &e)?,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"BoundingBox" {
                    record_extent(&mut layers, &e)?;
                }
            }
            Ok(Event::Text(t)) if in_name => {
                let text = t
                    .unescape()
                    .map_err(|e| FetchError::Capabilities(e.to_string()))?;
                if text.as_ref() == layer_name {
                    if let Some(layer) = layers.last_mut() {
                        layer.0 = true;
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"Name" => in_name = false,
                b"Layer" => {
                    if let Some((true, Some(extent))) = layers.pop() {
                        return Ok(Some(extent));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FetchError::Capabilities(format!(
                    "XML parsing error at position {}: {:?}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(None)
}

fn record_extent(
    layers: &mut [(bool, Option<LayerExtent>)],
    element: &BytesStart<'_>,
) -> FetchResult<()> {
    if let Some(layer) = layers.last_mut() {
        if layer.1.is_none() {
            layer.1 = Some(extent_of(element)?);
        }
    }
    Ok(())
}
