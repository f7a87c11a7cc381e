/*
 *  config.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration with command line overrides
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::Point;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::art::DEFAULT_CACHE_PATH;
use crate::display::compose::{ComposeOptions, FontChoice};
use crate::mopidy::DEFAULT_PORT;
use crate::playback::ButtonEvent;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Mopidy connection, the only required section
    #[serde(rename = "pirate-display")]
    pub server: ServerConfig,
    pub display: DisplayConfig,
    pub buttons: ButtonConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub mopidy_host: Option<String>,
    /// WebSocket (JSON-RPC) port
    pub mopidy_port: u16,
    /// HTTP port album art is served from
    pub mopidy_web_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            mopidy_host: None,
            mopidy_port: DEFAULT_PORT,
            mopidy_web_port: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    St7789,
    /// Frames go to a PNG file instead of a panel
    Preview,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub driver: DriverKind,
    pub rotate_deg: u16,
    pub spi_port: u8,
    pub spi_cs: u8,
    pub dc_pin: u8,
    pub backlight_pin: Option<u8>,
    pub spi_speed_hz: u32,
    pub preview_path: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            driver: DriverKind::St7789,
            rotate_deg: 90,
            spi_port: 0,
            spi_cs: 1,
            dc_pin: 9,
            backlight_pin: Some(13),
            spi_speed_hz: 80_000_000,
            preview_path: PathBuf::from("/tmp/pirate-display.png"),
        }
    }
}

/// BCM pin for each button
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ButtonPins {
    pub volume_down: u8,
    pub previous: u8,
    pub volume_up: u8,
    pub next: u8,
}

impl Default for ButtonPins {
    fn default() -> Self {
        // Pirate Audio: A, B, X, Y
        ButtonPins { volume_down: 5, previous: 6, volume_up: 16, next: 24 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ButtonConfig {
    pub enabled: bool,
    pub pins: ButtonPins,
    pub debounce_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        ButtonConfig {
            enabled: true,
            pins: ButtonPins::default(),
            debounce_ms: 100,
        }
    }
}

impl ButtonConfig {
    pub fn pin_for(&self, button: ButtonEvent) -> u8 {
        match button {
            ButtonEvent::VolumeDown => self.pins.volume_down,
            ButtonEvent::Previous => self.pins.previous,
            ButtonEvent::VolumeUp => self.pins.volume_up,
            ButtonEvent::Next => self.pins.next,
        }
    }
}

/// Largest outline pen, in pixels
pub const MAX_STROKE_WIDTH: u32 = 8;
/// Largest Gaussian sigma for the background
pub const MAX_BLUR_RADIUS: f32 = 50.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub blur: bool,
    /// Gaussian sigma
    pub blur_radius: f32,
    /// "#RRGGBB"
    pub stroke_color: String,
    pub stroke_width: u32,
    pub font: FontChoice,
    pub wrap_width: usize,
    pub title_pos: (i32, i32),
    pub artist_pos: (i32, i32),
    pub art_cache_path: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            blur: true,
            blur_radius: 5.0,
            stroke_color: "#0167B5".to_string(),
            stroke_width: 2,
            font: FontChoice::default(),
            wrap_width: 20,
            title_pos: (10, 20),
            artist_pos: (10, 190),
            art_cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
        }
    }
}

impl RenderConfig {
    /// Composer settings; call after `validate`
    pub fn compose_options(&self) -> Result<ComposeOptions, ConfigError> {
        Ok(ComposeOptions {
            blur: self.blur,
            blur_sigma: self.blur_radius,
            stroke_color: parse_hex_color(&self.stroke_color)?,
            stroke_width: self.stroke_width,
            font: self.font,
            wrap_width: self.wrap_width,
            title_anchor: Point::new(self.title_pos.0, self.title_pos.1),
            artist_anchor: Point::new(self.artist_pos.0, self.artist_pos.1),
        })
    }
}

/// Connection details once validation has passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub web_port: u16,
}

impl Config {
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        let host = self
            .server
            .mopidy_host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ConfigError::Validation("pirate-display.mopidy_host is required".into()))?;
        let web_port = self
            .server
            .mopidy_web_port
            .ok_or_else(|| ConfigError::Validation("pirate-display.mopidy_web_port is required".into()))?;
        Ok(Endpoint { host, port: self.server.mopidy_port, web_port })
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "pirate-display", version, about = "Mopidy now playing on a 240x240 SPI screen")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub mopidy_host: Option<String>,
    #[arg(long)]
    pub mopidy_port: Option<u16>,
    #[arg(long)]
    pub mopidy_web_port: Option<u16>,
    /// st7789 | preview
    #[arg(long, value_parser = parse_driver)]
    pub driver: Option<DriverKind>,
    #[arg(long)]
    pub rotate_deg: Option<u16>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub preview_path: Option<PathBuf>,
    /// Run without GPIO buttons
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_buttons: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_blur: bool,
    /// Outline colour, #RRGGBB
    #[arg(long)]
    pub stroke_color: Option<String>,
    /// 10x20 | 9x18 | 9x18_bold | 8x13
    #[arg(long, value_parser = parse_font)]
    pub font: Option<FontChoice>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: read YAML, apply overrides, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) YAML file (explicit path or search), defaults otherwise
    let mut cfg = if let Some(p) = cli.config.as_ref() {
        if !p.exists() {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        read_yaml(p)?
    } else if let Some(p) = find_config_file() {
        read_yaml(&p)?
    } else {
        Config::default()
    };

    // 2) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 3) Validate
    validate(&cfg)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/pirate-display/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/pirate-display/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/pirate-display.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["pirate-display.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.mopidy_host.is_some()      { cfg.server.mopidy_host = cli.mopidy_host.clone(); }
    if let Some(port) = cli.mopidy_port { cfg.server.mopidy_port = port; }
    if cli.mopidy_web_port.is_some()  { cfg.server.mopidy_web_port = cli.mopidy_web_port; }

    if let Some(driver) = cli.driver          { cfg.display.driver = driver; }
    if let Some(rot) = cli.rotate_deg         { cfg.display.rotate_deg = rot; }
    if let Some(p) = cli.preview_path.as_ref() { cfg.display.preview_path = p.clone(); }

    if cli.no_buttons { cfg.buttons.enabled = false; }

    if cli.no_blur { cfg.render.blur = false; }
    if let Some(c) = cli.stroke_color.as_ref() { cfg.render.stroke_color = c.clone(); }
    if let Some(font) = cli.font { cfg.render.font = font; }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    cfg.endpoint()?;

    match cfg.display.rotate_deg {
        0 | 90 | 180 | 270 => {},
        _ => return Err(ConfigError::Validation("display rotate_deg must be 0|90|180|270".into()))
    }
    if cfg.display.spi_speed_hz == 0 {
        return Err(ConfigError::Validation("display spi_speed_hz must be > 0".into()));
    }

    let pins = &cfg.buttons.pins;
    let all = [pins.volume_down, pins.previous, pins.volume_up, pins.next];
    for (i, pin) in all.iter().enumerate() {
        if all[i + 1..].contains(pin) {
            return Err(ConfigError::Validation(format!("button pin {} is assigned twice", pin)));
        }
    }

    if cfg.render.wrap_width == 0 {
        return Err(ConfigError::Validation("render wrap_width must be > 0".into()));
    }
    if cfg.render.blur && !(0.0..=MAX_BLUR_RADIUS).contains(&cfg.render.blur_radius) {
        return Err(ConfigError::Validation(format!("render blur_radius must be 0..={}", MAX_BLUR_RADIUS)));
    }
    if cfg.render.stroke_width > MAX_STROKE_WIDTH {
        return Err(ConfigError::Validation(format!("render stroke_width must be <= {}", MAX_STROKE_WIDTH)));
    }
    parse_hex_color(&cfg.render.stroke_color)?;
    Ok(())
}

/// "#RRGGBB" (leading # optional)
pub fn parse_hex_color(s: &str) -> Result<Rgb888, ConfigError> {
    let hex = s.trim().trim_start_matches('#');
    let bad = || ConfigError::Validation(format!("bad colour '{}', expected #RRGGBB", s));
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(bad());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
    Ok(Rgb888::new(channel(0)?, channel(2)?, channel(4)?))
}

fn parse_driver(s: &str) -> Result<DriverKind, String> {
    serde_yaml::from_str(s).map_err(|_| format!("unknown driver '{}', expected st7789 or preview", s))
}

fn parse_font(s: &str) -> Result<FontChoice, String> {
    // quote so "10x20" is never read as anything but a string
    serde_yaml::from_str(&format!("'{}'", s)).map_err(|_| format!("unknown font '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
pirate-display:
  mopidy_host: pi.local
  mopidy_web_port: 6680
render:
  blur: false
  stroke_color: "#FF0000"
  font: 8x13
buttons:
  debounce_ms: 50
"##;

    #[test]
    fn test_parse_sample() {
        let cfg = parse_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.server.mopidy_host.as_deref(), Some("pi.local"));
        assert_eq!(cfg.server.mopidy_port, 6680);
        assert_eq!(cfg.server.mopidy_web_port, Some(6680));
        assert!(!cfg.render.blur);
        assert_eq!(cfg.render.font, FontChoice::Font8x13);
        assert_eq!(cfg.buttons.debounce_ms, 50);
        // untouched sections keep their defaults
        assert_eq!(cfg.display, DisplayConfig::default());
        assert!(cfg.buttons.enabled);
        validate(&cfg).unwrap();
    }

    #[test]
    fn test_example_config_is_valid() {
        let cfg = parse_yaml(include_str!("../config.example.yaml")).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.display, DisplayConfig::default());
        assert_eq!(cfg.buttons, ButtonConfig::default());
        assert_eq!(cfg.render, RenderConfig::default());
        assert_eq!(cfg.endpoint().unwrap().web_port, 6680);
    }

    #[test]
    fn test_missing_host_or_web_port_is_fatal() {
        let cfg = parse_yaml("pirate-display:\n  mopidy_web_port: 6680\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));

        let cfg = parse_yaml("pirate-display:\n  mopidy_host: pi.local\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));

        assert!(validate(&Config::default()).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut cfg = parse_yaml(SAMPLE).unwrap();
        let cli = Cli {
            mopidy_host: Some("other.local".into()),
            driver: Some(DriverKind::Preview),
            no_buttons: true,
            font: Some(FontChoice::Font10x20),
            ..Default::default()
        };
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.endpoint().unwrap().host, "other.local");
        assert_eq!(cfg.display.driver, DriverKind::Preview);
        assert!(!cfg.buttons.enabled);
        assert_eq!(cfg.render.font, FontChoice::Font10x20);
        // not overridden
        assert_eq!(cfg.render.stroke_color, "#FF0000");
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "pirate-display", "--mopidy-host", "h", "--mopidy-web-port", "8080",
            "--driver", "preview", "--font", "9x18_bold", "--debug",
        ]).unwrap();
        assert_eq!(cli.mopidy_web_port, Some(8080));
        assert_eq!(cli.driver, Some(DriverKind::Preview));
        assert_eq!(cli.font, Some(FontChoice::Font9x18Bold));
        assert!(cli.debug);

        assert!(Cli::try_parse_from(["pirate-display", "--driver", "ssd1306"]).is_err());
    }

    #[test]
    fn test_bad_values_rejected() {
        let mut cfg = parse_yaml(SAMPLE).unwrap();
        cfg.display.rotate_deg = 45;
        assert!(validate(&cfg).is_err());

        let mut cfg = parse_yaml(SAMPLE).unwrap();
        cfg.buttons.pins.next = cfg.buttons.pins.previous;
        assert!(validate(&cfg).is_err());

        let mut cfg = parse_yaml(SAMPLE).unwrap();
        cfg.render.stroke_color = "blue".into();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_stroke_width_is_capped() {
        let cfg = parse_yaml("pirate-display:\n  mopidy_host: pi.local\n  mopidy_web_port: 6680\nrender:\n  stroke_width: 50000\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));

        let mut cfg = parse_yaml(SAMPLE).unwrap();
        cfg.render.stroke_width = MAX_STROKE_WIDTH;
        validate(&cfg).unwrap();
        let composer = crate::display::compose::FrameComposer::new(cfg.render.compose_options().unwrap());
        composer.compose(&crate::display::compose::Artwork::Blank, "A", "");
    }

    #[test]
    fn test_blur_radius_is_capped() {
        let mut cfg = parse_yaml(SAMPLE).unwrap();
        cfg.render.blur = true;
        cfg.render.blur_radius = 1.0e6;
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));

        cfg.render.blur_radius = f32::NAN;
        assert!(validate(&cfg).is_err());

        cfg.render.blur_radius = MAX_BLUR_RADIUS;
        validate(&cfg).unwrap();

        // ignored when blur is off
        cfg.render.blur = false;
        cfg.render.blur_radius = 1.0e6;
        validate(&cfg).unwrap();
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(parse_hex_color("#0167B5").unwrap(), Rgb888::new(1, 103, 181));
        assert_eq!(parse_hex_color("ffffff").unwrap(), Rgb888::new(255, 255, 255));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#GG0000").is_err());
    }

    #[test]
    fn test_compose_options_from_defaults() {
        let opts = RenderConfig::default().compose_options().unwrap();
        assert_eq!(opts, ComposeOptions::default());
    }

    #[test]
    fn test_dump_round_trips() {
        let cfg = parse_yaml(SAMPLE).unwrap();
        let dumped = serde_yaml::to_string(&cfg).unwrap();
        assert!(dumped.contains("pirate-display:"));
        assert_eq!(parse_yaml(&dumped).unwrap(), cfg);
    }
}
