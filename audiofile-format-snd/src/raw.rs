// Audiofile
// Copyright (c) 2026 The Audiofile Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use audiofile_core::errors::Result;
use audiofile_core::format::{FormatDescriptor, FormatInfo, ReadHeader, WriteHeader};
use audiofile_core::spec::{AudioSpec, FileType};
use audiofile_core::support_format;

const RAW_FORMAT_INFO: FormatInfo =
    FormatInfo { file_type: FileType::Raw, short_name: "raw", long_name: "Raw PCM" };

/// Builds a header for a headerless stream from a caller-supplied description. The frame count
/// in the description is replaced by one derived from the physical stream length when available.
pub fn read_header(spec: &AudioSpec, byte_len: Option<u64>) -> Result<ReadHeader> {
    let mut spec = *spec;
    spec.file_type = FileType::Raw;
    spec.byte_order = Some(spec.effective_byte_order());

    spec.validate()?;

    if let Some(len) = byte_len {
        spec.num_frames = len / spec.frame_size() as u64;
    }

    Ok(ReadHeader { spec, sample_data_offset: 0 })
}

/// Prepares a header for headerless output. Nothing is emitted and nothing requires patching.
pub fn write_header(spec: &AudioSpec) -> Result<WriteHeader> {
    let mut spec = *spec;
    spec.file_type = FileType::Raw;
    spec.byte_order = Some(spec.effective_byte_order());

    spec.validate()?;

    Ok(WriteHeader::new(spec, 0, Vec::new()))
}

/// Raw streams carry no magic and cannot be identified or parsed without a caller-supplied
/// description; the descriptor exists so the registry can report the file type's capabilities.
pub fn descriptor() -> FormatDescriptor {
    support_format!(RAW_FORMAT_INFO, &[], None, None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiofile_core::sample::SampleFormat;

    #[test]
    fn reader_derives_frames_from_length() {
        let spec = AudioSpec::new(FileType::Raw, SampleFormat::S24, 2, 22_050.0);

        let header = read_header(&spec, Some(601)).unwrap();
        assert_eq!(header.spec.num_frames, 100);
        assert_eq!(header.sample_data_offset, 0);
    }

    #[test]
    fn writer_needs_no_patching() {
        let spec = AudioSpec::new(FileType::Raw, SampleFormat::F32, 1, 48_000.0);

        let header = write_header(&spec).unwrap();
        assert!(!header.is_patchable());
        assert_eq!(header.sample_data_offset, 0);
    }
}
