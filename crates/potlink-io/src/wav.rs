//! Stereo WAV reading and writing for offline renders.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavWriter};

use crate::Result;

/// WAV file specification.
///
/// 32-bit files are written as IEEE float, narrower ones as integer PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels in the file.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample (16, 24 or 32).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Left and right channels of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoSamples {
    /// Left channel.
    pub left: Vec<f32>,
    /// Right channel.
    pub right: Vec<f32>,
}

impl StereoSamples {
    /// Pair two channels, truncating the longer one.
    pub fn new(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let len = left.len().min(right.len());
        left.truncate(len);
        right.truncate(len);
        Self { left, right }
    }

    /// Same signal on both sides.
    pub fn from_mono(mono: Vec<f32>) -> Self {
        Self {
            right: mono.clone(),
            left: mono,
        }
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True if there are no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Full-scale value for integer PCM of `bits` width.
fn int_scale(bits: u16) -> f32 {
    (1i64 << (bits - 1)) as f32
}

/// Read a WAV file as stereo.
///
/// Mono files are duplicated to both sides; files with more than two
/// channels keep the first two.
pub fn read_wav_stereo<P: AsRef<Path>>(path: P) -> Result<(StereoSamples, WavSpec)> {
    let reader = WavReader::open(path)?;
    let format = reader.spec().sample_format;
    let spec = WavSpec::from(reader.spec());
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    if channels == 1 {
        return Ok((StereoSamples::from_mono(interleaved), spec));
    }

    let frames = interleaved.len() / channels;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in interleaved.chunks_exact(channels) {
        left.push(frame[0]);
        right.push(frame[1]);
    }
    Ok((StereoSamples { left, right }, spec))
}

/// Write stereo samples. `spec.channels` is ignored; the file is always
/// two-channel.
pub fn write_wav_stereo<P: AsRef<Path>>(
    path: P,
    samples: &StereoSamples,
    spec: WavSpec,
) -> Result<()> {
    let spec = WavSpec { channels: 2, ..spec };
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;
    let frames = samples.left.iter().zip(&samples.right);

    if spec.bits_per_sample == 32 {
        for (&l, &r) in frames {
            writer.write_sample(l)?;
            writer.write_sample(r)?;
        }
    } else {
        let scale = int_scale(spec.bits_per_sample);
        let quantize = |x: f32| (x * scale).clamp(-scale, scale - 1.0) as i32;
        for (&l, &r) in frames {
            writer.write_sample(quantize(l))?;
            writer.write_sample(quantize(r))?;
        }
    }

    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_file_keeps_samples_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let samples = StereoSamples::new(vec![0.5, -0.25, 0.0], vec![-1.0, 0.125, 0.75]);
        write_wav_stereo(&path, &samples, WavSpec::default()).unwrap();

        let (read, spec) = read_wav_stereo(&path).unwrap();
        assert_eq!(read, samples);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
    }

    #[test]
    fn sixteen_bit_round_trip_is_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm16.wav");
        let samples = StereoSamples::new(vec![0.5, -0.5, 0.999], vec![0.1, -0.1, -1.0]);
        let spec = WavSpec {
            bits_per_sample: 16,
            sample_rate: 44100,
            ..WavSpec::default()
        };
        write_wav_stereo(&path, &samples, spec).unwrap();

        let (read, read_spec) = read_wav_stereo(&path).unwrap();
        assert_eq!(read_spec.bits_per_sample, 16);
        assert_eq!(read_spec.sample_rate, 44100);
        for (a, b) in read.left.iter().zip(&samples.left) {
            assert!((a - b).abs() < 1e-4);
        }
        for (a, b) in read.right.iter().zip(&samples.right) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn mono_file_is_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for s in [0.1f32, 0.2, 0.3] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let (read, read_spec) = read_wav_stereo(&path).unwrap();
        assert_eq!(read_spec.channels, 1);
        assert_eq!(read.left, vec![0.1, 0.2, 0.3]);
        assert_eq!(read.left, read.right);
    }

    #[test]
    fn new_truncates_to_shorter_channel() {
        let s = StereoSamples::new(vec![0.0; 4], vec![0.0; 3]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.right.len(), 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_wav_stereo("/nonexistent/potlink.wav").is_err());
    }
}
