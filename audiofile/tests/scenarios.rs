// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios driving the synchronous facade over in-memory files.

use std::io::Cursor;

use audiofile::core::io::{ReadOnlySource, SharedSink, SourceStream};
use audiofile::{AudioFile, AudioSpec, ByteOrder, Error, FileType, Frames, SampleFormat};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Fills `frames[ch][range]` with seeded noise in `[-1, 1)`.
fn fill_noise(frames: &mut Frames, off: usize, len: usize, seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);

    for ch in 0..frames.num_channels() {
        let plane = frames.plane_mut(ch).unwrap();
        for s in &mut plane[off..off + len] {
            *s = rng.random_range(-1.0..1.0);
        }
    }
}

fn max_error(a: &Frames, b: &Frames, len: usize) -> f64 {
    let mut max = 0.0f64;

    for ch in 0..a.num_channels() {
        let pa = a.plane(ch).unwrap();
        let pb = b.plane(ch).unwrap();
        for i in 0..len {
            max = max.max((pa[i] - pb[i]).abs());
        }
    }

    max
}

#[test]
fn next_round_trip_i16_stereo() {
    let spec = AudioSpec::new(FileType::Next, SampleFormat::S16, 2, 44_100.0);

    let mut reference = Frames::new(2, 10_000);
    fill_noise(&mut reference, 0, 8192, 0);
    fill_noise(&mut reference, 8192, 1808, 1);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();

    writer.write(&reference, 0, 8192).unwrap();
    writer.write(&reference, 8192, 1808).unwrap();

    assert_eq!(writer.num_frames(), 10_000);
    assert_eq!(writer.position(), 10_000);

    writer.close().unwrap();
    assert!(!writer.is_open());

    let bytes = sink.to_vec();

    // The fixed header: magic, dataOffset 28, dataSize 40000, encoding 3 (16-bit linear),
    // 44100 Hz, 2 channels.
    assert_eq!(&bytes[0..4], &[0x2e, 0x73, 0x6e, 0x64]);
    assert_eq!(&bytes[4..8], &28u32.to_be_bytes());
    assert_eq!(&bytes[8..12], &40_000u32.to_be_bytes());
    assert_eq!(&bytes[12..16], &3u32.to_be_bytes());
    assert_eq!(&bytes[16..20], &44_100u32.to_be_bytes());
    assert_eq!(&bytes[20..24], &2u32.to_be_bytes());
    assert_eq!(bytes.len(), 28 + 40_000);

    let mut reader = AudioFile::open_read(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();

    assert_eq!(spec.file_type, FileType::Next);
    assert_eq!(spec.sample_format, SampleFormat::S16);
    assert_eq!(spec.num_frames, 10_000);
    assert_eq!(spec.sample_rate, 44_100.0);

    let mut decoded = Frames::new(2, 10_000);
    reader.read(&mut decoded, 0, 10_000).unwrap();

    assert!(max_error(&reference, &decoded, 10_000) <= 2.02 / 65_536.0);
}

#[test]
fn float_round_trip_is_bit_exact() {
    let spec = AudioSpec::new(FileType::Wave, SampleFormat::F64, 1, 48_000.0);

    let mut reference = Frames::new(1, 500);
    fill_noise(&mut reference, 0, 500, 7);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
    writer.write(&reference, 0, 500).unwrap();
    writer.close().unwrap();

    let mut reader = AudioFile::open_read(Cursor::new(sink.to_vec())).unwrap();
    assert_eq!(reader.spec().sample_format, SampleFormat::F64);

    let mut decoded = Frames::new(1, 500);
    reader.read(&mut decoded, 0, 500).unwrap();

    assert_eq!(reference.plane(0).unwrap(), decoded.plane(0).unwrap());
}

#[test]
fn aifc_sowt_round_trip() {
    let spec = AudioSpec::new(FileType::Aiff, SampleFormat::S24, 1, 96_000.0)
        .with_byte_order(ByteOrder::LittleEndian);

    let mut reference = Frames::new(1, 5);
    reference.plane_mut(0).unwrap().copy_from_slice(&[-1.0, -0.5, 0.0, 0.5, 0.75]);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
    writer.write(&reference, 0, 5).unwrap();

    let sample_data_offset = writer.sample_data_offset() as usize;
    writer.close().unwrap();

    let bytes = sink.to_vec();

    // The payload must be little-endian packed 24-bit two's complement.
    let payload = &bytes[sample_data_offset..sample_data_offset + 15];
    assert_eq!(&payload[0..3], &[0x00, 0x00, 0x80]); // -1.0
    assert_eq!(&payload[3..6], &[0x00, 0x00, 0xc0]); // -0.5
    assert_eq!(&payload[6..9], &[0x00, 0x00, 0x00]); // 0.0
    assert_eq!(&payload[9..12], &[0x00, 0x00, 0x40]); // 0.5
    assert_eq!(&payload[12..15], &[0x00, 0x00, 0x60]); // 0.75

    let mut reader = AudioFile::open_read(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();

    assert_eq!(spec.file_type, FileType::Aiff);
    assert_eq!(spec.effective_byte_order(), ByteOrder::LittleEndian);
    assert_eq!(spec.num_frames, 5);

    let mut decoded = Frames::new(1, 5);
    reader.read(&mut decoded, 0, 5).unwrap();
    assert!(max_error(&reference, &decoded, 5) <= 2.02 / 16_777_216.0);
}

#[test]
fn wave_extensible_promotion() {
    let spec = AudioSpec::new(FileType::Wave, SampleFormat::F32, 6, 48_000.0);

    let mut reference = Frames::new(6, 1000);
    fill_noise(&mut reference, 0, 1000, 2);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
    writer.write(&reference, 0, 1000).unwrap();
    writer.close().unwrap();

    let bytes = sink.to_vec();

    // formatTag 0xFFFE with the IEEE float sub-format GUID.
    assert_eq!(&bytes[20..22], &0xfffeu16.to_le_bytes());
    assert_eq!(
        &bytes[44..60],
        &[0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71]
    );

    // The channel mask defaults to zero; callers provide one when they need placements.
    assert_eq!(&bytes[40..44], &0u32.to_le_bytes());

    let mut reader = AudioFile::open_read(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.spec().num_channels, 6);
    assert_eq!(reader.spec().sample_format, SampleFormat::F32);

    let mut decoded = Frames::new(6, 1000);
    reader.read(&mut decoded, 0, 1000).unwrap();
    assert_eq!(reference.plane(5).unwrap()[999] as f32, decoded.plane(5).unwrap()[999] as f32);
}

#[test]
fn next_length_sentinel_read() {
    // A hand-built NeXT file with the all-ones data size and a physical payload of 7 frames.
    let mut file = Vec::new();
    file.extend_from_slice(b".snd");
    file.extend_from_slice(&28u32.to_be_bytes());
    file.extend_from_slice(&0xffff_ffffu32.to_be_bytes());
    file.extend_from_slice(&5u32.to_be_bytes()); // 32-bit linear
    file.extend_from_slice(&22_050u32.to_be_bytes());
    file.extend_from_slice(&2u32.to_be_bytes());
    file.extend_from_slice(&0u32.to_be_bytes());
    file.extend_from_slice(&vec![0u8; 7 * 8]);

    let reader = AudioFile::open_read(Cursor::new(file)).unwrap();
    assert_eq!(reader.num_frames(), 7);
}

#[test]
fn identify_dispatch() {
    let aiff = b"FORM\x00\x00\x01\x00AIFF".to_vec();
    assert_eq!(AudioFile::identify(Cursor::new(aiff)).unwrap(), Some(FileType::Aiff));

    let next = b".snd\x00\x00\x00\x1c".to_vec();
    assert_eq!(AudioFile::identify(Cursor::new(next)).unwrap(), Some(FileType::Next));

    // Identification must leave the stream rewound for the subsequent header parse.
    let mut random = vec![0u8; 64];
    let mut rng = SmallRng::seed_from_u64(99);
    rng.fill(random.as_mut_slice());
    random[0] = b'x';

    use audiofile::core::io::ReadBytes;

    let mut stream = SourceStream::new(Box::new(Cursor::new(random)));
    assert_eq!(audiofile::default_registry().identify(&mut stream).unwrap(), None);
    assert_eq!(stream.pos(), 0);
}

#[test]
fn positioning_matches_sequential_read() {
    let spec = AudioSpec::new(FileType::Wave, SampleFormat::S32, 2, 44_100.0);

    let mut reference = Frames::new(2, 2000);
    fill_noise(&mut reference, 0, 2000, 3);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
    writer.write(&reference, 0, 2000).unwrap();
    writer.close().unwrap();

    let bytes = sink.to_vec();

    // Read 100 frames starting at frame 700 by seeking.
    let mut reader = AudioFile::open_read(Cursor::new(bytes.clone())).unwrap();
    reader.seek(700).unwrap();
    assert_eq!(reader.position(), 700);

    let mut via_seek = Frames::new(2, 100);
    reader.read(&mut via_seek, 0, 100).unwrap();
    assert_eq!(reader.position(), 800);

    // The same 100 frames by reading from the start.
    let mut reader = AudioFile::open_read(Cursor::new(bytes)).unwrap();
    let mut all = Frames::new(2, 800);
    reader.read(&mut all, 0, 800).unwrap();

    for ch in 0..2 {
        assert_eq!(&all.plane(ch).unwrap()[700..800], via_seek.plane(ch).unwrap());
    }
}

#[test]
fn length_coherence_after_reopen() {
    for (file_type, pad_to) in
        [(FileType::Wave, 2u64), (FileType::Aiff, 2), (FileType::Next, 1), (FileType::Wave64, 8)]
    {
        // An odd payload exercises the container padding: 333 frames of mono 8-bit.
        let fmt =
            if file_type == FileType::Wave { SampleFormat::U8 } else { SampleFormat::S8 };
        let spec = AudioSpec::new(file_type, fmt, 1, 8_000.0);

        let mut frames = Frames::new(1, 333);
        fill_noise(&mut frames, 0, 333, 4);

        let sink = SharedSink::new();
        let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
        writer.write(&frames, 0, 333).unwrap();
        writer.close().unwrap();

        let bytes = sink.to_vec();
        let reader = AudioFile::open_read(Cursor::new(bytes.clone())).unwrap();

        assert_eq!(reader.num_frames(), 333, "{:?}", file_type);

        let payload = 333u64;
        let padding = (pad_to - payload % pad_to) % pad_to;
        assert_eq!(
            bytes.len() as u64,
            reader.sample_data_offset() + payload + padding,
            "{:?}",
            file_type
        );
    }
}

#[test]
fn ircam_derives_frames_from_length() {
    let spec = AudioSpec::new(FileType::Ircam, SampleFormat::F32, 2, 44_100.0);

    let mut frames = Frames::new(2, 100);
    fill_noise(&mut frames, 0, 100, 5);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
    writer.write(&frames, 0, 100).unwrap();
    // No length field exists; flush must still succeed as a no-op.
    writer.flush().unwrap();
    writer.close().unwrap();

    let reader = AudioFile::open_read(Cursor::new(sink.to_vec())).unwrap();
    assert_eq!(reader.num_frames(), 100);
    assert_eq!(reader.sample_data_offset(), 1024);
}

#[test]
fn raw_requires_spec() {
    let spec = AudioSpec::new(FileType::Raw, SampleFormat::S16, 2, 44_100.0);

    let mut frames = Frames::new(2, 64);
    fill_noise(&mut frames, 0, 64, 6);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
    writer.write(&frames, 0, 64).unwrap();
    writer.close().unwrap();

    let bytes = sink.to_vec();
    assert_eq!(bytes.len(), 64 * 4);

    // A headerless stream cannot be identified.
    assert_eq!(AudioFile::identify(Cursor::new(bytes.clone())).unwrap(), None);

    let mut reader = AudioFile::open_read_raw(Cursor::new(bytes), &spec).unwrap();
    assert_eq!(reader.num_frames(), 64);

    let mut decoded = Frames::new(2, 64);
    reader.read(&mut decoded, 0, 64).unwrap();
    assert!(max_error(&frames, &decoded, 64) <= 2.02 / 65_536.0);
}

#[test]
fn copy_between_formats() {
    let wav_spec = AudioSpec::new(FileType::Wave, SampleFormat::S16, 2, 44_100.0);

    let mut frames = Frames::new(2, 300);
    fill_noise(&mut frames, 0, 300, 8);

    let wav_sink = SharedSink::new();
    let mut writer = AudioFile::open_write(wav_sink.clone(), &wav_spec).unwrap();
    writer.write(&frames, 0, 300).unwrap();
    writer.close().unwrap();

    let mut reader = AudioFile::open_read(Cursor::new(wav_sink.to_vec())).unwrap();

    let au_spec = AudioSpec::new(FileType::Next, SampleFormat::S16, 2, 44_100.0);
    let au_sink = SharedSink::new();
    let mut writer = AudioFile::open_write(au_sink.clone(), &au_spec).unwrap();

    reader.copy_to(&mut writer, 300).unwrap();
    writer.close().unwrap();

    let mut reader = AudioFile::open_read(Cursor::new(au_sink.to_vec())).unwrap();
    assert_eq!(reader.num_frames(), 300);

    let mut decoded = Frames::new(2, 300);
    reader.read(&mut decoded, 0, 300).unwrap();
    assert!(max_error(&frames, &decoded, 300) <= 2.02 / 32_768.0);
}

#[test]
fn unrecognized_input_is_an_error() {
    let garbage = vec![0x42u8; 256];
    match AudioFile::open_read(Cursor::new(garbage)) {
        Err(Error::Unrecognized) => (),
        r => panic!("expected unrecognized format, got {:?}", r.err()),
    }
}

#[test]
fn stream_backed_reader_rejects_seek() {
    let spec = AudioSpec::new(FileType::Wave, SampleFormat::S16, 1, 22_050.0);

    let mut frames = Frames::new(1, 64);
    fill_noise(&mut frames, 0, 64, 9);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
    writer.write(&frames, 0, 64).unwrap();
    writer.close().unwrap();

    // A one-shot stream can be opened and read sequentially, but not repositioned.
    let source = ReadOnlySource::new(Cursor::new(sink.to_vec()));
    let mut reader = AudioFile::open_read(source).unwrap();

    let mut decoded = Frames::new(1, 64);
    reader.read(&mut decoded, 0, 32).unwrap();

    match reader.seek(0) {
        Err(Error::UnsupportedOperation(_)) => (),
        r => panic!("expected unsupported operation, got {:?}", r.err()),
    }
}

#[test]
fn read_beyond_end_fails() {
    let spec = AudioSpec::new(FileType::Next, SampleFormat::S16, 1, 8_000.0);

    let mut frames = Frames::new(1, 10);
    fill_noise(&mut frames, 0, 10, 10);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
    writer.write(&frames, 0, 10).unwrap();
    writer.close().unwrap();

    let mut reader = AudioFile::open_read(Cursor::new(sink.to_vec())).unwrap();

    let mut decoded = Frames::new(1, 16);
    match reader.read(&mut decoded, 0, 16) {
        Err(Error::EndOfFile) => (),
        r => panic!("expected end of file, got {:?}", r.err()),
    }
}

#[test]
fn absent_planes_skip_on_read_and_fail_on_write() {
    let spec = AudioSpec::new(FileType::Wave, SampleFormat::S16, 2, 44_100.0);

    let mut frames = Frames::new(2, 32);
    fill_noise(&mut frames, 0, 32, 11);

    let sink = SharedSink::new();
    let mut writer = AudioFile::open_write(sink.clone(), &spec).unwrap();
    writer.write(&frames, 0, 32).unwrap();

    // A writer must refuse an absent plane.
    let mut partial = Frames::new(2, 32);
    partial.clear_plane(1);
    match writer.write(&partial, 0, 32) {
        Err(Error::InvalidArgument(_)) => (),
        r => panic!("expected invalid argument, got {:?}", r.err()),
    }

    writer.clean_up();

    // A reader discards channels whose plane is absent.
    let mut reader = AudioFile::open_read(Cursor::new(sink.to_vec())).unwrap();
    let mut decoded = Frames::new(2, 32);
    decoded.clear_plane(0);
    reader.read(&mut decoded, 0, 32).unwrap();

    assert!(decoded.plane(0).is_none());
    assert_eq!(
        decoded.plane(1).unwrap()[..],
        // Channel 1 still decodes under the PCM tolerance.
        {
            let mut full = Frames::new(2, 32);
            let mut reader = AudioFile::open_read(Cursor::new(sink.to_vec())).unwrap();
            reader.read(&mut full, 0, 32).unwrap();
            full.plane(1).unwrap().to_vec()
        }[..]
    );
}
