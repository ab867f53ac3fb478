use super::*;

use crate::encode::settings::FileType;
use crate::foundation::core::Size;

fn strings(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

fn value_after(args: &[String], flag: &str) -> String {
    let i = args.iter().position(|a| a == flag).unwrap();
    args[i + 1].clone()
}

#[test]
fn encode_args_carry_the_encoder_settings() {
    let cfg = VideoEncodeConfig::new(Size::new(1920, 1080), 30);
    let args = strings(&encode_video_args(&cfg, Path::new("/tmp/v.mp4")));

    assert_eq!(value_after(&args, "-s"), "1920x1080");
    assert_eq!(value_after(&args, "-r"), "30");
    assert_eq!(value_after(&args, "-c:v"), "libx264");
    assert_eq!(value_after(&args, "-b:v"), (1920u64 * 1080 * 3).to_string());
    assert_eq!(value_after(&args, "-g"), "60");
    assert_eq!(value_after(&args, "-bf"), "0");
    assert_eq!(value_after(&args, "-color_primaries"), "smpte170m");
    assert_eq!(value_after(&args, "-color_trc"), "bt709");
    assert_eq!(value_after(&args, "-colorspace"), "smpte170m");
    assert_eq!(args.last().map(String::as_str), Some("/tmp/v.mp4"));
    assert!(!args.iter().any(|a| a == "-vf"));
}

#[test]
fn odd_sizes_are_padded_for_the_encoder() {
    let cfg = VideoEncodeConfig::new(Size::new(641, 361), 30);
    let args = strings(&encode_video_args(&cfg, Path::new("/tmp/v.mp4")));
    assert_eq!(value_after(&args, "-s"), "641x361");
    assert_eq!(value_after(&args, "-vf"), "pad=ceil(iw/2)*2:ceil(ih/2)*2");
}

fn plan(audio: bool, network: bool) -> MuxPlan {
    MuxPlan {
        video: "/tmp/v.mp4".into(),
        audio: audio.then(|| ("/tmp/a.f32le".into(), AudioEncodeConfig::default())),
        order: vec![MediaKind::Audio, MediaKind::Video],
        options: WriterOptions {
            file_type: FileType::QuickTime,
            optimize_for_network: network,
        },
        out: "/tmp/out.mov".into(),
    }
}

#[test]
fn mux_maps_audio_before_video() {
    let args = strings(&mux_args(&plan(true, true)));

    let inputs: Vec<&String> = args
        .iter()
        .enumerate()
        .filter(|(i, _)| *i > 0 && args[i - 1] == "-i")
        .map(|(_, a)| a)
        .collect();
    assert_eq!(inputs, vec!["/tmp/a.f32le", "/tmp/v.mp4"]);

    let maps: Vec<&String> = args
        .iter()
        .enumerate()
        .filter(|(i, _)| *i > 0 && args[i - 1] == "-map")
        .map(|(_, a)| a)
        .collect();
    assert_eq!(maps, vec!["0:a:0", "1:v:0"]);

    assert_eq!(value_after(&args, "-c:a"), "aac");
    assert_eq!(value_after(&args, "-b:a"), "128000");
    assert_eq!(value_after(&args, "-movflags"), "+faststart");
    assert_eq!(value_after(&args, "-f"), "f32le");
    assert_eq!(args[args.len() - 2], "mov");
}

#[test]
fn mux_without_audio_copies_video_only() {
    let args = strings(&mux_args(&plan(false, false)));
    assert_eq!(value_after(&args, "-i"), "/tmp/v.mp4");
    assert_eq!(value_after(&args, "-map"), "0:v:0");
    assert!(!args.iter().any(|a| a == "-c:a" || a == "-movflags"));
}

#[test]
fn factory_rejects_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let factory = FfmpegWriterFactory::new();
    let missing = dir.path().join("nope").join("out.mp4");
    assert!(
        factory
            .create_writer(&missing, WriterOptions::default())
            .is_err()
    );
    assert!(
        factory
            .create_writer(dir.path(), WriterOptions::default())
            .is_err()
    );
}

#[test]
fn inputs_are_registered_before_start_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = FfmpegWriterFactory::new()
        .create_writer(&dir.path().join("out.mp4"), WriterOptions::default())
        .unwrap();
    let mut audio = writer
        .add_input(InputSettings::Audio(AudioEncodeConfig::default()))
        .unwrap();
    assert!(
        writer
            .add_input(InputSettings::Audio(AudioEncodeConfig::default()))
            .is_err()
    );
    // Not writing yet: no demand, appends refused.
    assert_eq!(audio.request_media_data(), Demand::Closed);
    assert!(
        audio
            .append(SampleBuffer::new(
                MediaKind::Audio,
                MediaTime::ZERO,
                MediaTime::ZERO,
                vec![0; 8],
            ))
            .is_err()
    );
    writer.cancel_writing();
    assert_eq!(writer.status(), WriterStatus::Cancelled);
}

#[test]
fn refused_video_frame_leaves_audio_input_open() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = FfmpegWriter::new(dir.path().join("out.mp4"), WriterOptions::default());
    writer.audio_tmp = dir.path().join("audio.f32le");
    let mut audio = writer
        .add_input(InputSettings::Audio(AudioEncodeConfig::default()))
        .unwrap();
    let mut video = writer
        .add_input(InputSettings::Video(VideoEncodeConfig::new(Size::new(4, 2), 30)))
        .unwrap();

    // Writing without an encoder child: only the audio scratch file is needed.
    let (_, sink) = writer.audio.as_ref().unwrap();
    lock(sink).file = Some(BufWriter::new(File::create(&writer.audio_tmp).unwrap()));
    *lock(&writer.shared.status) = WriterStatus::Writing;

    let short_frame =
        SampleBuffer::new(MediaKind::Video, MediaTime::ZERO, MediaTime::ZERO, vec![0; 7]);
    assert!(video.append(short_frame).is_err());
    assert!(!video.is_ready_for_more_media_data());
    assert_eq!(video.request_media_data(), Demand::Closed);

    assert_eq!(writer.status(), WriterStatus::Writing);
    assert!(audio.is_ready_for_more_media_data());
    assert_eq!(audio.request_media_data(), Demand::Ready);
    audio
        .append(SampleBuffer::new(
            MediaKind::Audio,
            MediaTime::ZERO,
            MediaTime::ZERO,
            vec![0; 8],
        ))
        .unwrap();
    audio.mark_as_finished();

    assert_eq!(writer.finish_writing(), WriterStatus::Failed);
    assert!(writer.error().unwrap().contains("expected 32"));
    assert!(!writer.audio_tmp.exists());
}
