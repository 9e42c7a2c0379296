//! Container probing with Symphonia
//!
//! A fetched resource is probed once before it becomes a playable unit. This
//! rejects undecodable payloads (HTML error pages, truncated files) at load
//! time and gives the engine a duration before the first play.

use crate::error::{AudioError, Result};
use std::io::Cursor;
use std::time::Duration;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

/// Stream parameters discovered by probing
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedAudio {
    /// Total length, when the container reports a frame count
    pub duration: Option<Duration>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// Short codec name ("mp3", "aac", "pcm_s16le", ...)
    pub codec: String,
}

/// Probe `bytes` and check that the default track can be decoded
pub fn probe_audio(bytes: Vec<u8>, extension: Option<&str>) -> Result<ProbedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let track = probed
        .format
        .default_track()
        .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Decode("no audio track found".into()))?;
    let params = &track.codec_params;

    let codecs = symphonia::default::get_codecs();
    codecs.make(params, &DecoderOptions::default())?;

    let duration = params.n_frames.and_then(|frames| {
        let time_base = params
            .time_base
            .or_else(|| params.sample_rate.map(|rate| TimeBase::new(1, rate)))?;
        let time = time_base.calc_time(frames);
        Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
    });

    Ok(ProbedAudio {
        duration,
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count() as u16),
        codec: codecs
            .get_codec(params.codec)
            .map_or_else(|| "unknown".to_string(), |d| d.short_name.to_string()),
    })
}
