//! Microphone / line-in capture feeding the spectrum analyser.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use torch_core::audio::{AudioMode, AudioSource, SpectrumAnalyser};
use torch_core::constants::FFT_SIZE;

// Samples kept between frames if the renderer stalls.
const BACKLOG_LIMIT: usize = FFT_SIZE * 4;

/// Default input device as an [`AudioSource`].
///
/// The audio callback appends mono samples to a shared backlog; frames
/// drain it with `try_lock`, so a busy audio thread costs at most one
/// stale spectrum and never blocks rendering.
pub struct CaptureSource {
    backlog: Arc<Mutex<Vec<f32>>>,
    analyser: SpectrumAnalyser,
    drained: Vec<f32>,
    _stream: cpal::Stream,
}

impl CaptureSource {
    pub fn start() -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("no default input device"))?;
        let config = device
            .default_input_config()
            .context("default input config")?;
        let channels = config.channels() as usize;
        log::info!(
            "capturing from {} ({} Hz, {} ch, {:?})",
            device.name().unwrap_or_else(|_| "unknown device".into()),
            config.sample_rate().0,
            channels,
            config.sample_format()
        );

        let backlog = Arc::new(Mutex::new(Vec::with_capacity(BACKLOG_LIMIT)));
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config.into(), channels, Arc::clone(&backlog))
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config.into(), channels, Arc::clone(&backlog))
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config.into(), channels, Arc::clone(&backlog))
            }
            other => return Err(anyhow!("unsupported sample format {other:?}")),
        }
        .context("building input stream")?;
        stream.play().context("starting input stream")?;

        Ok(Self {
            backlog,
            analyser: SpectrumAnalyser::new(FFT_SIZE),
            drained: Vec::with_capacity(BACKLOG_LIMIT),
            _stream: stream,
        })
    }
}

impl AudioSource for CaptureSource {
    fn bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    fn current_samples(&mut self, mode: AudioMode, out: &mut [f32]) {
        if let Ok(mut backlog) = self.backlog.try_lock() {
            self.drained.extend(backlog.drain(..));
        }
        self.analyser.push_samples(&self.drained);
        self.drained.clear();
        self.analyser.current_samples(mode, out);
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    backlog: Arc<Mutex<Vec<f32>>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let channels = channels.max(1);
    device.build_input_stream(
        config,
        move |data: &[T], _| {
            let Ok(mut buf) = backlog.lock() else {
                return;
            };
            for frame in data.chunks(channels) {
                let sum: f32 = frame
                    .iter()
                    .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
                    .sum();
                buf.push(sum / frame.len() as f32);
            }
            if buf.len() > BACKLOG_LIMIT {
                let excess = buf.len() - BACKLOG_LIMIT;
                buf.drain(..excess);
            }
        },
        |err| log::warn!("audio input error: {err}"),
        None,
    )
}
