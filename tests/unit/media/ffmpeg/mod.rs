use super::*;
use std::io::Cursor;

#[test]
fn read_chunk_fills_across_short_reads() {
    struct Dribble(Cursor<Vec<u8>>);
    impl Read for Dribble {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(3);
            self.0.read(&mut buf[..n])
        }
    }

    let mut src = Dribble(Cursor::new((0u8..10).collect()));
    let mut buf = [0u8; 8];
    assert_eq!(read_chunk(&mut src, &mut buf).unwrap(), 8);
    assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7]);

    let mut rest = [0u8; 8];
    assert_eq!(read_chunk(&mut src, &mut rest).unwrap(), 2);
    assert_eq!(&rest[..2], &[8, 9]);
    assert_eq!(read_chunk(&mut src, &mut rest).unwrap(), 0);
}

#[test]
fn ensure_parent_dir_creates_nested_directories() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("a").join("b").join("out.mp4");
    ensure_parent_dir(&out).unwrap();
    assert!(out.parent().unwrap().is_dir());
    ensure_parent_dir(Path::new("relative.mp4")).unwrap();
}

#[test]
fn temp_paths_are_distinct_per_stem() {
    let a = temp_path("video", "mp4");
    let b = temp_path("audio", "f32le");
    assert_ne!(a, b);
    assert!(a.starts_with(std::env::temp_dir()));
    assert_eq!(b.extension().and_then(|e| e.to_str()), Some("f32le"));
}

#[test]
fn seconds_are_clamped_and_fixed_point() {
    assert_eq!(secs_arg(1.5), "1.500000");
    assert_eq!(secs_arg(-2.0), "0.000000");
}
