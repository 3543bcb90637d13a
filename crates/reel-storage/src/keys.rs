//! Object key layout and content types.

use reel_models::{AssetKind, VideoId};

pub const CONTENT_TYPE_PNG: &str = "image/png";
pub const CONTENT_TYPE_MP3: &str = "audio/mpeg";
pub const CONTENT_TYPE_MP4: &str = "video/mp4";
pub const CONTENT_TYPE_JPEG: &str = "image/jpeg";

/// Prefix under which everything for a video is stored.
pub fn video_prefix(video_id: &VideoId) -> String {
    format!("videos/{}/", video_id)
}

/// `videos/{id}/images/scene_{n:03}.png`
pub fn image_key(video_id: &VideoId, scene_number: u32) -> String {
    format!("videos/{}/images/scene_{:03}.png", video_id, scene_number)
}

/// `videos/{id}/audio/scene_{n:03}.mp3`
pub fn audio_key(video_id: &VideoId, scene_number: u32) -> String {
    format!("videos/{}/audio/scene_{:03}.mp3", video_id, scene_number)
}

/// Key for a generated scene asset.
pub fn asset_key(video_id: &VideoId, kind: AssetKind, scene_number: u32) -> String {
    match kind {
        AssetKind::Image => image_key(video_id, scene_number),
        AssetKind::Audio => audio_key(video_id, scene_number),
    }
}

/// Content type of a generated scene asset.
pub fn asset_content_type(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Image => CONTENT_TYPE_PNG,
        AssetKind::Audio => CONTENT_TYPE_MP3,
    }
}

pub fn final_video_key(video_id: &VideoId) -> String {
    format!("videos/{}/final.mp4", video_id)
}

pub fn thumbnail_key(video_id: &VideoId) -> String {
    format!("videos/{}/thumbnail.jpg", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = VideoId::from_string("v1");
        assert_eq!(image_key(&id, 3), "videos/v1/images/scene_003.png");
        assert_eq!(audio_key(&id, 12), "videos/v1/audio/scene_012.mp3");
        assert_eq!(final_video_key(&id), "videos/v1/final.mp4");
        assert_eq!(thumbnail_key(&id), "videos/v1/thumbnail.jpg");
        assert!(asset_key(&id, AssetKind::Audio, 1).starts_with(&video_prefix(&id)));
    }

    #[test]
    fn test_asset_content_types() {
        assert_eq!(asset_content_type(AssetKind::Image), CONTENT_TYPE_PNG);
        assert_eq!(asset_content_type(AssetKind::Audio), CONTENT_TYPE_MP3);
    }
}
