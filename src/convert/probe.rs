use std::io::Cursor;
use symphonia::core::codecs::{CodecType, CODEC_TYPE_MP3};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::AudioFormat;

/// Whether `payload` parses as an audio container with at least one track
/// carrying the codec `format` implies.
///
/// Used to reject truncated, garbage or mislabelled transcoder output before
/// it can replace a playable recording.
pub fn is_playable(payload: &[u8], format: AudioFormat) -> bool {
    if payload.is_empty() {
        return false;
    }

    let source = MediaSourceStream::new(Box::new(Cursor::new(payload.to_vec())), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    match symphonia::default::get_probe().format(
        &hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(probed) => match (probed.format.default_track(), expected_codec(format)) {
            (Some(track), Some(codec)) => track.codec_params.codec == codec,
            (Some(_), None) => true,
            (None, _) => false,
        },
        Err(_) => false,
    }
}

/// Codec a track must carry for `format`; `None` accepts any
fn expected_codec(format: AudioFormat) -> Option<CodecType> {
    match format {
        AudioFormat::Mp3 => Some(CODEC_TYPE_MP3),
        _ => None,
    }
}
