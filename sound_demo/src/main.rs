//! Sound demo: builds one sound through the audio service, fades it in,
//! plays it to completion and tears everything down again.
//!
//! Usage: `sound_demo [config.toml|config.ron] [clip-address]`

use audio_services::prelude::*;
use audio_services::config::ConfigError;
use futures::executor::block_on;
use std::rc::Rc;
use std::time::Duration;

const DEFAULT_CLIP: &str = "sfx/beep";
const FRAME_TIME: Duration = Duration::from_millis(16);
const FADE_IN_SECONDS: f32 = 0.25;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
}

struct SoundDemoApp {
    service: AudioService,
    address: String,
}

impl SoundDemoApp {
    fn new(config: &AudioServiceConfig, address: String) -> Result<Self, DemoError> {
        let service = AudioService::from_config(config)?;
        Ok(Self { service, address })
    }

    fn build_sound(&self) -> Result<Sound, DemoError> {
        let builder = self
            .service
            .create_builder("demo")
            .with_asset_address(self.address.as_str())
            .with_mixer_group("SFX")
            .with_queued_tween(FadeVolumeTween::fade_in(FADE_IN_SECONDS));

        match block_on(builder.build()) {
            Ok(sound) => Ok(sound),
            Err(AudioError::ClipNotFound { .. }) => {
                log::warn!("Clip '{}' not found, falling back to one second of silence", self.address);
                let clip = Rc::new(AudioClip::silent("silence", Duration::from_secs(1)));
                let sound = block_on(
                    self.service
                        .create_builder("demo")
                        .with_audio_clip(clip)
                        .with_queued_tween(FadeVolumeTween::fade_in(FADE_IN_SECONDS))
                        .build(),
                )?;
                Ok(sound)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn run(&mut self) -> Result<(), DemoError> {
        let sound = self.build_sound()?;
        sound.on_completed(|sound| log::info!("Sound '{}' completed", sound.id()));

        let done = sound.play_async()?;
        let mut timer = FrameTimer::new();
        while sound.is_playing() {
            std::thread::sleep(FRAME_TIME);
            self.service.update(timer.tick());
        }
        block_on(done)?;
        log::info!(
            "Played '{}' for {:.2}s over {} frames",
            self.address,
            timer.total_time(),
            timer.frame_count()
        );

        sound.unload();
        Ok(())
    }
}

impl Drop for SoundDemoApp {
    fn drop(&mut self) {
        self.service.shutdown();
    }
}

fn load_config(path: Option<&str>) -> Result<AudioServiceConfig, ConfigError> {
    match path {
        Some(path) => AudioServiceConfig::load_from_file(path),
        None => Ok(AudioServiceConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(args.first().map(String::as_str))?;
    logging::init(&config.log_level);

    log::info!("Starting sound demo");

    let address = args.get(1).cloned().unwrap_or_else(|| DEFAULT_CLIP.to_string());
    let result = SoundDemoApp::new(&config, address).and_then(|mut app| app.run());

    match result {
        Ok(()) => {
            log::info!("Sound demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Sound demo failed: {e}");
            Err(e.into())
        }
    }
}
