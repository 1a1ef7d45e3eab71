//! Asset request parsing.
//!
//! Turns the raw request parameters into a list of [`RenditionRequest`]s.
//! Two encodings are supported, in order of preference:
//!
//! 1. suffix segments appended to the asset path, each describing one
//!    rendition: `mediaFormat=web,width=960/width=640.json`;
//! 2. repeated `mediaFormat`/`width`/`height` query parameters, zipped
//!    positionally.
//!
//! With neither present, exactly one unconstrained request for the whole
//! asset is produced. Malformed input never fails: unparseable numbers
//! become 0, pairs without exactly one `=` are dropped, and a segment that
//! contributes no recognized constraint is dropped entirely.

use dam_client::RenditionRequest;

pub const RP_MEDIAFORMAT: &str = "mediaFormat";
pub const RP_WIDTH: &str = "width";
pub const RP_HEIGHT: &str = "height";

/// Parse all rendition requests for `asset_path` from the given suffix
/// segments and/or raw query string.
pub fn parse_asset_requests(
    asset_path: &str,
    suffix: Option<&str>,
    raw_query: Option<&str>,
) -> Vec<RenditionRequest> {
    let mut requests = requests_from_suffix(asset_path, suffix);
    if requests.is_empty() {
        requests = requests_from_query(asset_path, raw_query);
    }
    if requests.is_empty() {
        requests.push(RenditionRequest::unconstrained(asset_path));
    }
    requests
}

fn requests_from_suffix(asset_path: &str, suffix: Option<&str>) -> Vec<RenditionRequest> {
    let Some(suffix) = suffix else {
        return Vec::new();
    };
    // Everything from the first '.' is the request extension, not a
    // constraint.
    let without_extension = suffix.split('.').next().unwrap_or_default();

    without_extension
        .split('/')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let mut media_format = None;
            let mut width = 0u64;
            let mut height = 0u64;
            for pair in segment.split(',') {
                let mut parts = pair.split('=');
                let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next())
                else {
                    // Not exactly key=value; drop the pair.
                    continue;
                };
                match key {
                    RP_MEDIAFORMAT if !value.is_empty() => media_format = Some(value.to_string()),
                    RP_WIDTH => width = value.parse().unwrap_or(0),
                    RP_HEIGHT => height = value.parse().unwrap_or(0),
                    _ => {}
                }
            }
            if media_format.is_some() || width > 0 || height > 0 {
                Some(RenditionRequest {
                    asset_path: asset_path.to_string(),
                    media_format,
                    width,
                    height,
                })
            } else {
                None
            }
        })
        .collect()
}

fn requests_from_query(asset_path: &str, raw_query: Option<&str>) -> Vec<RenditionRequest> {
    let Some(raw_query) = raw_query else {
        return Vec::new();
    };

    let mut media_formats: Vec<String> = Vec::new();
    let mut widths: Vec<String> = Vec::new();
    let mut heights: Vec<String> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
        match key.as_ref() {
            RP_MEDIAFORMAT => media_formats.push(value.into_owned()),
            RP_WIDTH => widths.push(value.into_owned()),
            RP_HEIGHT => heights.push(value.into_owned()),
            _ => {}
        }
    }

    let max_param_index = media_formats.len().max(widths.len()).max(heights.len());
    (0..max_param_index)
        .map(|i| RenditionRequest {
            asset_path: asset_path.to_string(),
            media_format: media_formats.get(i).filter(|f| !f.is_empty()).cloned(),
            width: widths.get(i).and_then(|w| w.parse().ok()).unwrap_or(0),
            height: heights.get(i).and_then(|h| h.parse().ok()).unwrap_or(0),
        })
        .collect()
}
