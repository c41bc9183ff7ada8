// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios driving the asynchronous facade.

use std::path::PathBuf;

use audiofile::{AsyncAudioFile, AudioSpec, ByteOrder, FileType, Frames, SampleFormat};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("audiofile-{}-{}", std::process::id(), name))
}

fn fill_noise(frames: &mut Frames, seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);

    for ch in 0..frames.num_channels() {
        for s in frames.plane_mut(ch).unwrap() {
            *s = rng.random_range(-1.0..1.0);
        }
    }
}

#[tokio::test]
async fn async_file_round_trip() {
    let path = scratch_path("roundtrip.wav");

    let spec = AudioSpec::new(FileType::Wave, SampleFormat::S24, 2, 48_000.0);

    let mut reference = Frames::new(2, 1500);
    fill_noise(&mut reference, 0);

    let mut writer = AsyncAudioFile::open_write_path(&path, &spec).await.unwrap();

    // Sequential writes chained on one facade, then a flush patching the length fields.
    for chunk in 0..100 {
        writer.write(&reference, chunk * 15, 15).await.unwrap();
    }
    writer.flush().await.unwrap();
    writer.close().await.unwrap();
    assert!(!writer.is_open());

    let mut reader = AsyncAudioFile::open_read_path(&path).await.unwrap();

    assert_eq!(reader.spec().file_type, FileType::Wave);
    assert_eq!(reader.spec().sample_format, SampleFormat::S24);
    assert_eq!(reader.num_frames(), 1500);

    let mut decoded = Frames::new(2, 1500);
    reader.read(&mut decoded, 0, 1500).await.unwrap();
    reader.close().await.unwrap();

    for ch in 0..2 {
        let a = reference.plane(ch).unwrap();
        let b = decoded.plane(ch).unwrap();
        for i in 0..1500 {
            assert!((a[i] - b[i]).abs() <= 2.02 / 16_777_216.0);
        }
    }

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn async_seek_rereads_samples() {
    let path = scratch_path("seek.au");

    let spec = AudioSpec::new(FileType::Next, SampleFormat::F32, 1, 44_100.0);

    let mut reference = Frames::new(1, 256);
    fill_noise(&mut reference, 1);

    let mut writer = AsyncAudioFile::open_write_path(&path, &spec).await.unwrap();
    writer.write(&reference, 0, 256).await.unwrap();
    writer.close().await.unwrap();

    let mut reader = AsyncAudioFile::open_read_path(&path).await.unwrap();

    let mut first = Frames::new(1, 64);
    reader.seek(128).await.unwrap();
    assert_eq!(reader.position(), 128);
    reader.read(&mut first, 0, 64).await.unwrap();

    reader.seek(128).await.unwrap();
    let mut second = Frames::new(1, 64);
    reader.read(&mut second, 0, 64).await.unwrap();
    reader.close().await.unwrap();

    assert_eq!(first.plane(0).unwrap(), second.plane(0).unwrap());

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn async_writer_back_patches_under_sequential_load() {
    let path = scratch_path("backpatch.aiff");

    let spec = AudioSpec::new(FileType::Aiff, SampleFormat::S16, 2, 44_100.0)
        .with_byte_order(ByteOrder::BigEndian);

    let mut frames = Frames::new(2, 10);
    fill_noise(&mut frames, 2);

    let mut writer = AsyncAudioFile::open_write_path(&path, &spec).await.unwrap();

    // 100 sequential writes, then a flush: the patched lengths must reflect the cumulative
    // frame count.
    for _ in 0..100 {
        writer.write(&frames, 0, 10).await.unwrap();
    }
    writer.flush().await.unwrap();
    writer.close().await.unwrap();

    let reader = AsyncAudioFile::open_read_path(&path).await.unwrap();
    assert_eq!(reader.num_frames(), 1000);

    let meta = std::fs::metadata(&path).unwrap();
    assert_eq!(meta.len(), reader.sample_data_offset() + 1000 * 4);

    let _ = std::fs::remove_file(&path);
}
