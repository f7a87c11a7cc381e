/*
 *  display/compose.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame composer - album art background, outlined title and artist text
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

use embedded_graphics::mono_font::{iso_8859_1, MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::{Rgb565, Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text, TextStyle, TextStyleBuilder};
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use textwrap::{Options, WordSeparator, WordSplitter, WrapAlgorithm};

use crate::display::frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};

/// Accent colour used for the text outline, #0167B5
pub const DEFAULT_STROKE: Rgb888 = Rgb888::new(0x01, 0x67, 0xB5);

/// Monospace fonts available for the overlay text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontChoice {
    #[default]
    #[serde(rename = "10x20")]
    Font10x20,
    #[serde(rename = "9x18")]
    Font9x18,
    #[serde(rename = "9x18_bold")]
    Font9x18Bold,
    #[serde(rename = "8x13")]
    Font8x13,
}

impl FontChoice {
    pub fn font(self) -> &'static MonoFont<'static> {
        match self {
            FontChoice::Font10x20 => &iso_8859_1::FONT_10X20,
            FontChoice::Font9x18 => &iso_8859_1::FONT_9X18,
            FontChoice::Font9x18Bold => &iso_8859_1::FONT_9X18_BOLD,
            FontChoice::Font8x13 => &iso_8859_1::FONT_8X13,
        }
    }

    pub fn line_height(self) -> u32 {
        self.font().character_size.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOptions {
    pub blur: bool,
    pub blur_sigma: f32,
    pub stroke_color: Rgb888,
    pub stroke_width: u32,
    pub font: FontChoice,
    /// Wrap width in characters
    pub wrap_width: usize,
    pub title_anchor: Point,
    pub artist_anchor: Point,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            blur: true,
            blur_sigma: 5.0,
            stroke_color: DEFAULT_STROKE,
            stroke_width: 2,
            font: FontChoice::default(),
            wrap_width: 20,
            title_anchor: Point::new(10, 20),
            artist_anchor: Point::new(10, 190),
        }
    }
}

/// Background source for one frame
#[derive(Debug, Clone)]
pub enum Artwork {
    /// Decoded album art, any size
    Art(RgbImage),
    /// No art available; solid black
    Blank,
}

/// Greedy word wrap at `width` columns.
///
/// Words are never split, not even at hyphens; a word wider than `width`
/// gets a line of its own. Empty or all-whitespace input gives no lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let options = Options::new(width.max(1))
        .wrap_algorithm(WrapAlgorithm::FirstFit)
        .word_separator(WordSeparator::AsciiSpace)
        .word_splitter(WordSplitter::NoHyphenation)
        .break_words(false);
    textwrap::wrap(text, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

/// Builds frames from art and track text. Holds no state between calls,
/// so identical inputs always give identical frames.
#[derive(Debug, Clone)]
pub struct FrameComposer {
    options: ComposeOptions,
    stroke: Rgb565,
    text_style: TextStyle,
}

impl FrameComposer {
    pub fn new(options: ComposeOptions) -> Self {
        let stroke = Rgb565::from(options.stroke_color);
        let text_style = TextStyleBuilder::new().baseline(Baseline::Top).build();
        FrameComposer { options, stroke, text_style }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Lines that fit between the title anchor and the artist anchor
    pub fn title_max_lines(&self) -> usize {
        let span = self.options.artist_anchor.y - self.options.title_anchor.y;
        lines_in(span, self.options.font.line_height())
    }

    /// Lines that fit between the artist anchor and the bottom edge
    pub fn artist_max_lines(&self) -> usize {
        let span = FRAME_HEIGHT as i32 - self.options.artist_anchor.y;
        lines_in(span, self.options.font.line_height())
    }

    /// Scale the art to the frame and soften it if configured
    pub fn prepare_background(&self, artwork: &Artwork) -> Frame {
        match artwork {
            Artwork::Blank => Frame::blank(),
            Artwork::Art(img) => {
                let mut scaled = imageops::resize(img, FRAME_WIDTH, FRAME_HEIGHT, FilterType::Triangle);
                if self.options.blur && self.options.blur_sigma > 0.0 {
                    scaled = imageops::blur(&scaled, self.options.blur_sigma);
                }
                Frame::from_rgb_image(&scaled)
            }
        }
    }

    pub fn compose(&self, artwork: &Artwork, title: &str, artist: &str) -> Frame {
        let mut frame = self.prepare_background(artwork);

        let mut title_lines = wrap_text(title, self.options.wrap_width);
        title_lines.truncate(self.title_max_lines());
        let mut artist_lines = wrap_text(artist, self.options.wrap_width);
        artist_lines.truncate(self.artist_max_lines());

        self.draw_block(&mut frame, &title_lines, self.options.title_anchor);
        self.draw_block(&mut frame, &artist_lines, self.options.artist_anchor);
        frame
    }

    fn draw_block(&self, frame: &mut Frame, lines: &[String], anchor: Point) {
        let font = self.options.font.font();
        let line_height = self.options.font.line_height() as i32;
        let stroke_style = MonoTextStyle::new(font, self.stroke);
        let fill_style = MonoTextStyle::new(font, Rgb565::WHITE);
        let w = self.options.stroke_width as i32;

        for (i, line) in lines.iter().enumerate() {
            let origin = anchor + Point::new(0, i as i32 * line_height);

            // outline: the glyph stamped at every offset inside a round pen
            for dy in -w..=w {
                for dx in -w..=w {
                    if (dx == 0 && dy == 0) || dx * dx + dy * dy > w * w {
                        continue;
                    }
                    Text::with_text_style(line, origin + Point::new(dx, dy), stroke_style, self.text_style)
                        .draw(frame)
                        .ok();
                }
            }
            Text::with_text_style(line, origin, fill_style, self.text_style)
                .draw(frame)
                .ok();
        }
    }
}

impl Default for FrameComposer {
    fn default() -> Self {
        FrameComposer::new(ComposeOptions::default())
    }
}

fn lines_in(span: i32, line_height: u32) -> usize {
    if span <= 0 || line_height == 0 {
        return 0;
    }
    (span as u32 / line_height) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use proptest::prelude::*;

    /// Words (including non-ASCII ones) joined by runs of spaces or newlines
    fn text_strategy() -> impl Strategy<Value = String> {
        let word = "[a-zA-Z0-9éüßñøÅ'’-]{1,30}";
        let gap = prop_oneof![Just(" "), Just("  "), Just("   "), Just("\n")];
        prop::collection::vec((word, gap), 0..25).prop_map(|parts| {
            parts.into_iter().map(|(w, g)| format!("{}{}", w, g)).collect::<String>()
        })
    }

    fn words(s: &str) -> Vec<&str> {
        s.split([' ', '\n']).filter(|w| !w.is_empty()).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_wrap_keeps_words_whole(text in text_strategy(), width in 5usize..40) {
            let lines = wrap_text(&text, width);
            let rejoined: Vec<&str> = lines.iter().flat_map(|l| words(l)).collect();
            prop_assert_eq!(rejoined, words(&text));
        }

        #[test]
        fn test_wrap_respects_width(text in text_strategy(), width in 5usize..40) {
            for line in wrap_text(&text, width) {
                let single_word = !line.trim_matches(' ').contains(' ');
                prop_assert!(
                    line.trim_end_matches(' ').chars().count() <= width || single_word,
                    "line {:?} wider than {}", line, width
                );
            }
        }

        #[test]
        fn test_title_never_reaches_artist_block(title in text_strategy()) {
            let composer = FrameComposer::default();
            let frame = composer.compose(&Artwork::Blank, &title, "");
            let floor = (composer.options().artist_anchor.y - 1) as u32;
            for y in floor..FRAME_HEIGHT {
                for x in 0..FRAME_WIDTH {
                    prop_assert_eq!(frame.pixel(x, y), Some(Rgb565::BLACK));
                }
            }
        }
    }

    #[test]
    fn test_wrap_never_splits_words() {
        let text = "The quick brown fox jumps over the lazy dog while singing anti-establishment songs";
        let lines = wrap_text(text, 20);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 20, "line too long: {:?}", line);
        }
        let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
        assert!(lines.iter().any(|l| l.contains("anti-establishment")));
    }

    #[test]
    fn test_wrap_long_word_gets_own_line() {
        let lines = wrap_text("a Supercalifragilisticexpialidocious b", 20);
        assert_eq!(lines, vec!["a", "Supercalifragilisticexpialidocious", "b"]);
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap_text("", 20).is_empty());
        assert!(wrap_text("   ", 20).is_empty());
        assert_eq!(wrap_text("Hello", 20), vec!["Hello"]);
    }

    #[test]
    fn test_default_line_bounds() {
        let composer = FrameComposer::default();
        assert_eq!(composer.options().font.line_height(), 20);
        assert_eq!(composer.title_max_lines(), 8);
        assert_eq!(composer.artist_max_lines(), 2);
    }

    #[test]
    fn test_line_bounds_follow_anchors() {
        let composer = FrameComposer::new(ComposeOptions {
            artist_anchor: Point::new(10, 250),
            ..Default::default()
        });
        assert_eq!(composer.artist_max_lines(), 0);
        assert_eq!(composer.title_max_lines(), 11);
    }

    #[test]
    fn test_compose_is_deterministic() {
        let composer = FrameComposer::default();
        let art = Artwork::Art(RgbImage::from_fn(300, 300, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 80])));
        let a = composer.compose(&art, "Bohemian Rhapsody", "Queen");
        let b = composer.compose(&art, "Bohemian Rhapsody", "Queen");
        assert_eq!(a.to_be_bytes(), b.to_be_bytes());
    }

    #[test]
    fn test_blank_background_keeps_corners_black() {
        let composer = FrameComposer::default();
        let frame = composer.compose(&Artwork::Blank, "Title", "Artist");
        assert_eq!(frame.pixel(0, 0), Some(Rgb565::BLACK));
        assert_eq!(frame.pixel(239, 239), Some(Rgb565::BLACK));
        assert_eq!(frame.pixel(239, 0), Some(Rgb565::BLACK));
    }

    #[test]
    fn test_text_is_drawn_with_outline() {
        let composer = FrameComposer::default();
        let frame = composer.compose(&Artwork::Blank, "WWWW", "");
        let stroke = Rgb565::from(DEFAULT_STROKE);
        let block = (0..60u32).flat_map(|x| (10..50u32).map(move |y| (x, y)));
        let (mut white, mut outlined) = (0, 0);
        for (x, y) in block {
            match frame.pixel(x, y) {
                Some(Rgb565::WHITE) => white += 1,
                Some(c) if c == stroke => outlined += 1,
                _ => {}
            }
        }
        assert!(white > 0);
        assert!(outlined > 0);
        // nothing drawn in the artist block
        assert!((0..240).all(|x| frame.pixel(x, 200) == Some(Rgb565::BLACK)));
    }

    #[test]
    fn test_title_lines_are_bounded() {
        let composer = FrameComposer::default();
        let long_title = "word ".repeat(80);
        let frame = composer.compose(&Artwork::Blank, &long_title, "");
        // 8 lines of 20px from y=20 end at 180; the artist block stays untouched
        assert!((0..240).all(|x| (185..240).all(|y| frame.pixel(x, y) == Some(Rgb565::BLACK))));
    }

    #[test]
    fn test_solid_art_survives_resize_and_blur() {
        let composer = FrameComposer::default();
        let art = Artwork::Art(RgbImage::from_pixel(300, 300, Rgb([255, 0, 0])));
        let frame = composer.prepare_background(&art);
        assert_eq!(frame.pixel(120, 120), Some(Rgb565::RED));
    }

    #[test]
    fn test_font_choice_names() {
        let f: FontChoice = serde_yaml::from_str("9x18_bold").unwrap();
        assert_eq!(f, FontChoice::Font9x18Bold);
        assert_eq!(FontChoice::Font8x13.line_height(), 13);
    }
}
