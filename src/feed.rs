//! Match input: one game per line, each line the sequence of point-winner
//! labels in the order the points were played.
//!
//! ```text
//! # game 1
//! HFHHHHHHHHHFH
//! HHFF HFFF HHFH HHFF HFHH
//! ```
//!
//! Blank lines and `#` comments are skipped and whitespace inside a line is
//! ignored. Labels are not checked here; the tracker rejects unknown ones
//! with the point they occurred at.

use std::io::BufRead;

use anyhow::{Context, Result};
use tracing::debug;

/// Split match text into per-game label strings.
pub fn parse_games(text: &str) -> Vec<String> {
    text.lines().filter_map(parse_line).collect()
}

/// Read and parse a match description line by line.
pub fn read_games<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut games = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read match input at line {}", n + 1))?;
        if let Some(game) = parse_line(&line) {
            games.push(game);
        }
    }
    debug!("Read {} games", games.len());
    Ok(games)
}

fn parse_line(line: &str) -> Option<String> {
    let content = match line.split_once('#') {
        Some((before, _)) => before,
        None => line,
    };
    let game: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    if game.is_empty() {
        None
    } else {
        Some(game)
    }
}
