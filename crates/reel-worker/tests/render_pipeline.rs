mod common;

use std::sync::atomic::Ordering;

use common::{narrated_plan, FakeImages, FakeSpeech, Harness, ScriptedMedia};
use reel_media::VisualEffect;
use reel_models::{
    AspectRatio, AssetRunOutcome, AssetRunStatus, RenderOutcome, RenderStage, Resolution, Scene,
    VideoId, VideoPlan,
};
use reel_storage::{keys, ObjectStore};
use reel_worker::{PipelineStore, WorkerError};

async fn generated(plan: &VideoPlan) -> Harness {
    let harness = Harness::healthy().with_plan(plan).await;
    harness
        .orchestrator
        .generate_all_assets(&plan.video_id)
        .await
        .unwrap();
    harness
}

fn expected_clip(n: u32) -> String {
    format!("png:skyline view {}mp3:narration {}\n", n, n)
}

#[tokio::test]
async fn test_render_success_publishes_video_and_cleans_up() {
    let plan = narrated_plan("v-ok", 3);
    let harness = generated(&plan).await;

    let result = harness.renderer.render_video(&plan.video_id).await.unwrap();

    assert_eq!(result.video_url, "memory://videos/v-ok/final.mp4");
    assert_eq!(result.thumbnail_url, "memory://videos/v-ok/thumbnail.jpg");
    assert_eq!(result.duration_seconds, 12);
    assert!(harness.leftover_workspaces().is_empty());

    let video = harness
        .objects
        .inner
        .get(&keys::final_video_key(&plan.video_id))
        .unwrap();
    let expected: String = (1..=3).map(expected_clip).collect();
    assert_eq!(String::from_utf8(video.bytes).unwrap(), expected);
    assert_eq!(video.content_type, keys::CONTENT_TYPE_MP4);

    assert_eq!(
        harness.media.effects(),
        vec![VisualEffect::ZoomIn, VisualEffect::ZoomOut, VisualEffect::PanLeft]
    );

    let history = harness.store.render_history();
    let stages: Vec<(RenderStage, u8)> = history
        .iter()
        .map(|p| (p.stage, p.progress_percent))
        .collect();
    assert_eq!(
        stages,
        vec![
            (RenderStage::Preparing, 0),
            (RenderStage::RenderingScenes, 0),
            (RenderStage::RenderingScenes, 27),
            (RenderStage::RenderingScenes, 53),
            (RenderStage::RenderingScenes, 80),
            (RenderStage::Concatenating, 80),
            (RenderStage::GeneratingThumbnail, 85),
            (RenderStage::Uploading, 90),
            (RenderStage::Uploading, 95),
            (RenderStage::Completed, 100),
        ]
    );
    assert_eq!(history[1].current_scene, Some(0));
    assert_eq!(history[4].current_scene, Some(3));
    assert_eq!(history[4].total_scenes, Some(3));

    match harness.store.load_render_outcome(&plan.video_id).await.unwrap() {
        Some(RenderOutcome::Completed {
            video_key,
            duration_seconds,
            ..
        }) => {
            assert_eq!(video_key, "videos/v-ok/final.mp4");
            assert_eq!(duration_seconds, 12);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_scene_without_audio_is_skipped_but_counted() {
    let plan = VideoPlan::new(
        VideoId::from_string("v-gap"),
        vec![
            Scene::new(1, "skyline view 1", "narration 1"),
            Scene::new(2, "skyline view 2", ""),
            Scene::new(3, "skyline view 3", "narration 3"),
        ],
    );
    let harness = generated(&plan).await;

    harness.renderer.render_video(&plan.video_id).await.unwrap();

    assert_eq!(harness.media.render_calls.load(Ordering::SeqCst), 2);
    // Effects follow plan position, so the skipped scene's effect is not reused.
    assert_eq!(
        harness.media.effects(),
        vec![VisualEffect::ZoomIn, VisualEffect::PanLeft]
    );

    let video = harness
        .objects
        .inner
        .get(&keys::final_video_key(&plan.video_id))
        .unwrap();
    let expected = format!("{}{}", expected_clip(1), expected_clip(3));
    assert_eq!(String::from_utf8(video.bytes).unwrap(), expected);

    let loop_end = harness
        .store
        .render_history()
        .into_iter()
        .filter(|p| p.stage == RenderStage::RenderingScenes)
        .last()
        .unwrap();
    assert_eq!(loop_end.progress_percent, 80);
}

#[tokio::test]
async fn test_portrait_plan_renders_portrait_clips() {
    let plan = narrated_plan("v-tall", 2).with_aspect_ratio(AspectRatio::PORTRAIT);
    let harness = generated(&plan).await;

    harness.renderer.render_video(&plan.video_id).await.unwrap();

    assert_eq!(
        harness.media.resolutions(),
        vec![Resolution::new(1080, 1920), Resolution::new(1080, 1920)]
    );
}

#[tokio::test]
async fn test_no_usable_images_never_creates_workspace() {
    let plan = narrated_plan("v-empty", 3);
    let harness = Harness::new(
        FakeImages::unavailable(),
        FakeSpeech::unavailable(),
        ScriptedMedia::default(),
    )
    .with_plan(&plan)
    .await;

    let report = harness
        .orchestrator
        .generate_all_assets(&plan.video_id)
        .await
        .unwrap();
    assert_eq!(report.status, AssetRunStatus::Failed);

    let err = harness.renderer.render_video(&plan.video_id).await.unwrap_err();
    assert!(matches!(err, WorkerError::NoUsableAssets(_)));
    assert!(!harness.work_dir().exists());
    assert_eq!(harness.media.render_calls.load(Ordering::SeqCst), 0);

    let last = harness.store.render_history().pop().unwrap();
    assert_eq!(last.stage, RenderStage::Failed);
    assert!(last.error.unwrap().contains("No usable assets"));
}

#[tokio::test]
async fn test_failed_asset_outcome_blocks_render() {
    let plan = narrated_plan("v-blocked", 2);
    let harness = generated(&plan).await;
    harness
        .store
        .save_asset_outcome(
            &plan.video_id,
            &AssetRunOutcome::new(AssetRunStatus::Failed, &["Scene 1 image: boom".to_string()]),
        )
        .await
        .unwrap();

    let err = harness.renderer.render_video(&plan.video_id).await.unwrap_err();
    assert!(matches!(err, WorkerError::NoUsableAssets(_)));
    assert!(!harness.work_dir().exists());
}

#[tokio::test]
async fn test_first_scene_failure_reports_rendering_stage() {
    let plan = narrated_plan("v-first", 3);
    let harness = generated(&plan).await;
    let key = keys::image_key(&plan.video_id, 1);
    harness.objects.inner.delete(&[key]).await.unwrap();

    assert!(harness.renderer.render_video(&plan.video_id).await.is_err());
    assert!(harness.leftover_workspaces().is_empty());

    let stages: Vec<(RenderStage, u8)> = harness
        .store
        .render_history()
        .iter()
        .map(|p| (p.stage, p.progress_percent))
        .collect();
    assert_eq!(
        stages,
        vec![
            (RenderStage::Preparing, 0),
            (RenderStage::RenderingScenes, 0),
            (RenderStage::Failed, 0),
        ]
    );
}

#[tokio::test]
async fn test_no_clips_rendered_is_fatal() {
    // Narration disabled: images exist but no scene has audio.
    let plan = narrated_plan("v-mute", 2).with_voice("none");
    let harness = generated(&plan).await;

    let err = harness.renderer.render_video(&plan.video_id).await.unwrap_err();
    assert!(matches!(err, WorkerError::NoClipsRendered(_)));
    assert!(harness.leftover_workspaces().is_empty());

    let last = harness.store.render_history().pop().unwrap();
    assert_eq!(last.stage, RenderStage::Failed);
    assert_eq!(last.progress_percent, 80);
}

#[derive(Debug, Clone, Copy)]
enum Injected {
    Preparing,
    Rendering,
    Concatenating,
    Thumbnail,
    Uploading,
}

#[tokio::test]
async fn test_workspace_removed_after_failure_at_every_stage() {
    let cases = [
        (Injected::Preparing, 0),
        (Injected::Rendering, 27),
        (Injected::Concatenating, 80),
        (Injected::Thumbnail, 85),
        (Injected::Uploading, 90),
    ];

    for (stage, expected_percent) in cases {
        let plan = narrated_plan("v-fail", 3);
        let harness = generated(&plan).await;

        match stage {
            Injected::Preparing => harness.store.fail_list_assets.store(true, Ordering::SeqCst),
            Injected::Rendering => {
                let key = keys::image_key(&plan.video_id, 2);
                harness.objects.inner.delete(&[key]).await.unwrap();
            }
            Injected::Concatenating => harness.media.fail_concat.store(true, Ordering::SeqCst),
            Injected::Thumbnail => harness.media.fail_thumbnail.store(true, Ordering::SeqCst),
            Injected::Uploading => harness.objects.fail_uploads_ending_with("final.mp4"),
        }

        let result = harness.renderer.render_video(&plan.video_id).await;
        assert!(result.is_err(), "{:?} should fail", stage);
        assert!(
            harness.leftover_workspaces().is_empty(),
            "{:?} left a workspace behind",
            stage
        );

        let last = harness.store.render_history().pop().unwrap();
        assert_eq!(last.stage, RenderStage::Failed, "{:?}", stage);
        assert_eq!(last.progress_percent, expected_percent, "{:?}", stage);
        assert!(last.error.is_some());

        let outcome = harness
            .store
            .load_render_outcome(&plan.video_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.is_completed(), "{:?}", stage);
        assert!(!harness
            .objects
            .inner
            .contains(&keys::thumbnail_key(&plan.video_id)));
    }
}

#[tokio::test]
async fn test_render_retry_after_failure_starts_over() {
    let plan = narrated_plan("v-retry", 2);
    let harness = generated(&plan).await;

    harness.media.fail_concat.store(true, Ordering::SeqCst);
    assert!(harness.renderer.render_video(&plan.video_id).await.is_err());

    harness.media.fail_concat.store(false, Ordering::SeqCst);
    let result = harness.renderer.render_video(&plan.video_id).await.unwrap();
    assert_eq!(result.duration_seconds, 12);
    assert_eq!(harness.media.render_calls.load(Ordering::SeqCst), 4);

    let outcome = harness
        .store
        .load_render_outcome(&plan.video_id)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_completed());
    assert!(harness.leftover_workspaces().is_empty());
}
