use std::fmt::Write;

use crate::index::DocumentId;

/// One place in a search response, best first.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchHit {
    pub id: DocumentId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Text relevance as computed by the index.
    pub relevance: f32,
    /// Final score after distance blending; hits are ordered by it.
    pub score: f64,
    /// Distance in miles to the nearest proximity center the place is near.
    pub distance: Option<f64>,
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}

fn element(out: &mut String, tag: &str, value: impl std::fmt::Display) {
    let _ = write!(out, "<{tag}>");
    escape_into(out, &value.to_string());
    let _ = writeln!(out, "</{tag}>");
}

/// Render hits as an XML `places` document, keeping their order.
///
/// ```text
/// <?xml version="1.0"?>
/// <places>
/// <place id="modern:0">
/// <place_name>Rome</place_name>
/// <latitude>41.9</latitude>
/// <longitude>12.5</longitude>
/// <score>1.2</score>
/// </place>
/// </places>
/// ```
pub fn to_xml(hits: &[SearchHit]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<places>\n");
    for hit in hits {
        out.push_str("<place id=\"");
        escape_into(&mut out, &hit.id.to_string());
        out.push_str("\">\n");
        element(&mut out, "place_name", &hit.name);
        element(&mut out, "latitude", hit.latitude);
        element(&mut out, "longitude", hit.longitude);
        element(&mut out, "score", hit.score);
        if let Some(distance) = hit.distance {
            element(&mut out, "distance", distance);
        }
        out.push_str("</place>\n");
    }
    out.push_str("</places>\n");
    out
}
