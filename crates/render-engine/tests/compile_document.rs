//! Markup-to-ffmpeg-command tests against an in-memory probe.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clipweave_common::config::RenderDefaults;
use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use clipweave_content::{build_document, parse_document};
use clipweave_model::{Content, RenderContext};
use clipweave_render_engine::{
    build_preview_plan, build_render_plan, compile_document, compile_preview, OutputFormat,
    RenderJob,
};
use clipweave_style::probe::{AudioStreamInfo, MediaInfo, VideoStreamInfo};
use clipweave_style::MediaProbe;

struct FakeProbe {
    media: HashMap<PathBuf, MediaInfo>,
}

impl FakeProbe {
    fn new() -> Self {
        let video = |secs: f64, audio: bool| MediaInfo {
            duration_secs: Some(secs),
            video: Some(VideoStreamInfo {
                width: 640,
                height: 360,
            }),
            audio: audio.then(|| AudioStreamInfo {
                channel_layout: Some("stereo".to_string()),
                channels: Some(2),
            }),
        };
        let mut media = HashMap::new();
        media.insert(PathBuf::from("/media/a.mp4"), video(1.0, true));
        media.insert(PathBuf::from("/media/b.mp4"), video(2.0, true));
        media.insert(PathBuf::from("/media/silent.mp4"), video(2.0, false));
        media.insert(
            PathBuf::from("/media/voice.wav"),
            MediaInfo {
                duration_secs: Some(4.0),
                video: None,
                audio: Some(AudioStreamInfo {
                    channel_layout: Some("mono".to_string()),
                    channels: Some(1),
                }),
            },
        );
        media.insert(
            PathBuf::from("/media/logo.png"),
            MediaInfo {
                duration_secs: None,
                video: Some(VideoStreamInfo {
                    width: 200,
                    height: 100,
                }),
                audio: None,
            },
        );
        Self { media }
    }
}

impl MediaProbe for FakeProbe {
    fn probe(&self, path: &Path) -> ClipweaveResult<MediaInfo> {
        self.media
            .get(path)
            .cloned()
            .ok_or_else(|| ClipweaveError::source_probe(path, "not in fixture"))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

fn build(body: &str, sheet: &str) -> (Content, RenderContext) {
    let text = format!(
        r#"<vsml><meta><style>{sheet}</style></meta><cont resolution="640x360" fps="30">{body}</cont></vsml>"#
    );
    let document = parse_document(&text, Path::new("/media")).unwrap();
    let context = document.context;
    (
        build_document(&document, Box::new(FakeProbe::new())).unwrap(),
        context,
    )
}

fn job(output: &str) -> RenderJob {
    RenderJob::from_defaults(output, &RenderDefaults::default()).unwrap()
}

fn filter_complex(args: &[String]) -> &str {
    let at = args.iter().position(|a| a == "-filter_complex").unwrap();
    &args[at + 1]
}

#[test]
fn test_sequence_renders_sum_of_children() {
    let (root, context) = build(r#"<vid src="a.mp4"/><vid src="b.mp4"/>"#, "");
    let compiled = compile_document(&root, context, 48_000).unwrap();
    assert_eq!(compiled.duration_secs, 3.0);
    assert_eq!(compiled.total_frames(), 90);

    let plan = build_render_plan(compiled, &job("/tmp/out.mp4"));
    let filter = filter_complex(&plan.ffmpeg_args);
    assert!(filter.contains("concat=n=2:v=1:a=0"));
    assert!(filter.contains("concat=n=2:v=0:a=1"));
    assert!(plan
        .ffmpeg_args
        .windows(2)
        .any(|w| w[0] == "-i" && w[1] == "/media/b.mp4"));
}

#[test]
fn test_video_without_audio_gets_silence() {
    let (root, context) = build(r#"<vid src="a.mp4"/><vid src="silent.mp4"/>"#, "");
    let compiled = compile_document(&root, context, 48_000).unwrap();
    let text = compiled.graph.to_filter_complex();
    assert!(text.contains("anullsrc"));
    assert!(!text.contains("1:a:0"));
}

#[test]
fn test_parallel_voice_over_mixes_and_fills_canvas() {
    let (root, context) = build(
        r#"<prl><vid src="b.mp4"/><aud src="voice.wav"/></prl>"#,
        "",
    );
    let compiled = compile_document(&root, context, 44_100).unwrap();
    assert_eq!(compiled.duration_secs, 4.0);
    let text = compiled.graph.to_filter_complex();
    assert!(text.contains("amix=inputs=2"));
    assert!(text.contains("amerge=inputs=2"));
    assert!(text.contains("sample_rates=44100"));
}

#[test]
fn test_repeated_source_is_read_once() {
    let (root, context) = build(
        r#"<img src="logo.png"/><img src="logo.png"/>"#,
        "img { object-length: 1s }",
    );
    let compiled = compile_document(&root, context, 48_000).unwrap();
    assert_eq!(compiled.graph.inputs().len(), 1);
    assert_eq!(compiled.duration_secs, 2.0);
}

#[test]
fn test_text_and_styles_reach_drawtext() {
    let (root, context) = build(
        r#"<txt class="title">Hello, world</txt>"#,
        ".title { object-length: 2s; font-size: 40px; font-color: red; background-color: blue }",
    );
    let compiled = compile_document(&root, context, 48_000).unwrap();
    let text = compiled.graph.to_filter_complex();
    assert!(text.contains("drawtext="));
    assert!(text.contains("fontsize=40"));
    assert!(text.contains("0xFF0000FF"));
    assert!(compiled.audio.is_none());
}

#[test]
fn test_fit_document_is_rejected() {
    let (root, context) = build(r#"<img src="logo.png"/>"#, "");
    let err = compile_document(&root, context, 48_000).unwrap_err();
    assert!(matches!(err, ClipweaveError::UnresolvedDimension { .. }));
}

#[test]
fn test_preview_plan_for_middle_frame() {
    let (root, context) = build(r#"<vid src="a.mp4"/><vid src="b.mp4"/>"#, "");
    let preview = compile_preview(&root, context, 45).unwrap();
    assert_eq!(preview.second, 1.5);
    let plan = build_preview_plan(preview, &job("/tmp/frame.png"));
    let filter = filter_complex(&plan.ffmpeg_args);
    // 0.5s into the second clip
    assert!(filter.contains("trim=start=0.5"));
    assert!(!plan.ffmpeg_args.contains(&"/media/a.mp4".to_string()));
}

#[test]
fn test_webm_codecs() {
    let (root, context) = build(r#"<vid src="a.mp4"/>"#, "");
    let compiled = compile_document(&root, context, 48_000).unwrap();
    let mut job = job("/tmp/out.webm");
    assert_eq!(job.format, OutputFormat::Webm);
    job.overwrite = true;
    let plan = build_render_plan(compiled, &job);
    assert!(plan.ffmpeg_args.contains(&"libvpx-vp9".to_string()));
    assert!(plan.ffmpeg_args.contains(&"libopus".to_string()));
    assert!(plan.ffmpeg_args.contains(&"-y".to_string()));
}
