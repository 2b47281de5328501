//! HLS playlist classification.
//!
//! A fetched body is either a master (variant) playlist whose entries point
//! at other playlists, or a media (leaf) playlist that is itself playable.
//! Anything without an `#EXTM3U` header is a parse failure.

use m3u8_rs::Playlist;
use tracing::warn;
use url::Url;

use crate::error::ParseError;

/// `WIDTHxHEIGHT` from `EXT-X-STREAM-INF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

/// One `EXT-X-STREAM-INF` entry of a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantChild {
    /// Absolute URL of the referenced playlist.
    pub url: String,
    pub resolution: Option<Resolution>,
    /// Peak bits per second.
    pub bandwidth: u64,
}

/// Parsed shape of one fetched playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestNode {
    /// Master playlist, children in document order.
    Variant(Vec<VariantChild>),
    /// Media playlist: playable as-is.
    Leaf,
}

/// Parse `body`, resolving child URIs against `url`.
///
/// I-frame-only variants are skipped since they are not watchable streams.
/// Children whose URI cannot be joined onto `url` are dropped with a warning.
pub fn parse_manifest(body: &str, url: &str) -> Result<ManifestNode, ParseError> {
    let body = body.trim_start_matches('\u{feff}').trim_start();
    if !body.starts_with("#EXTM3U") {
        return Err(ParseError {
            reason: "missing #EXTM3U header".into(),
        });
    }

    let base = Url::parse(url).map_err(|e| ParseError {
        reason: format!("bad playlist URL {url}: {e}"),
    })?;
    let playlist = m3u8_rs::parse_playlist_res(body.as_bytes()).map_err(|e| ParseError {
        reason: e.to_string(),
    })?;

    match playlist {
        Playlist::MediaPlaylist(_) => Ok(ManifestNode::Leaf),
        Playlist::MasterPlaylist(master) => {
            let children = master
                .variants
                .into_iter()
                .filter(|v| !v.is_i_frame)
                .filter_map(|v| match base.join(v.uri.trim()) {
                    Ok(child) => Some(VariantChild {
                        url: child.to_string(),
                        resolution: v.resolution.map(|r| Resolution {
                            width: r.width,
                            height: r.height,
                        }),
                        bandwidth: v.bandwidth,
                    }),
                    Err(e) => {
                        warn!(uri = %v.uri, error = %e, "Dropping unresolvable variant");
                        None
                    }
                })
                .collect();
            Ok(ManifestNode::Variant(children))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
360/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720,CODECS=\"avc1.4d401f,mp4a.40.2\"
/hls/720/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=64000
https://audio.example.com/aac.m3u8
#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=100000,RESOLUTION=640x360,URI=\"iframe.m3u8\"
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:10
#EXT-X-MEDIA-SEQUENCE:0
#EXTINF:9.009,
segment0.ts
#EXTINF:9.009,
segment1.ts
#EXT-X-ENDLIST
";

    #[test]
    fn master_children_resolved_against_playlist_url() {
        let node = parse_manifest(MASTER, "https://cdn.example.com/hls/master.m3u8").unwrap();
        let ManifestNode::Variant(children) = node else {
            panic!("expected variant");
        };
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].url, "https://cdn.example.com/hls/360/index.m3u8");
        assert_eq!(
            children[0].resolution,
            Some(Resolution {
                width: 640,
                height: 360
            })
        );
        assert_eq!(children[1].url, "https://cdn.example.com/hls/720/index.m3u8");
        assert_eq!(children[1].bandwidth, 2_800_000);
        assert_eq!(children[2].url, "https://audio.example.com/aac.m3u8");
        assert_eq!(children[2].resolution, None);
    }

    #[test]
    fn media_playlist_is_leaf() {
        let node = parse_manifest(MEDIA, "https://cdn.example.com/hls/720/index.m3u8").unwrap();
        assert_eq!(node, ManifestNode::Leaf);
    }

    #[test]
    fn html_is_not_a_playlist() {
        let err = parse_manifest(
            "<!DOCTYPE html><html><body>Not found</body></html>",
            "https://cdn.example.com/x.m3u8",
        )
        .unwrap_err();
        assert!(err.reason.contains("EXTM3U"));
    }

    #[test]
    fn tolerates_bom_and_leading_blank_lines() {
        let body = format!("\u{feff}\n\n{MEDIA}");
        assert_eq!(
            parse_manifest(&body, "https://cdn.example.com/a.m3u8").unwrap(),
            ManifestNode::Leaf
        );
    }
}
