use std::mem;

use crate::prelude::*;

pub fn format_date(date: Date) -> String {
  date.format("%d.%m.%Y").to_string()
}

pub fn today() -> Date {
  Local::now().date_naive()
}

/// Parses a comma separated list of Telegram ids, skipping blanks.
pub fn parse_ids(input: &str) -> Result<Vec<i64>> {
  input
    .split(',')
    .map(str::trim)
    .filter(|id| !id.is_empty())
    .map(|id| {
      id.parse()
        .map_err(|_| Error::InvalidArgs(format!("bad Telegram id `{id}`")))
    })
    .collect()
}

/// Maximum message length for Telegram Bot API (4096 characters).
/// A slightly smaller limit leaves room for HTML entity expansion.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4000;

/// Splits a long message into chunks that fit within Telegram's message limit.
/// Splits at newlines where possible and never inside a UTF-8 character.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
  let max_len =
    if max_len == 0 { TELEGRAM_MAX_MESSAGE_LENGTH } else { max_len };

  if text.len() <= max_len {
    return vec![text.to_string()];
  }

  let mut chunks = Vec::new();
  let mut current = String::new();

  for line in text.lines() {
    if !current.is_empty() && current.len() + line.len() + 1 > max_len {
      chunks.push(mem::take(&mut current));
    }

    if line.len() <= max_len {
      if !current.is_empty() {
        current.push('\n');
      }
      current.push_str(line);
      continue;
    }

    if !current.is_empty() {
      chunks.push(mem::take(&mut current));
    }

    let mut rest = line;
    while rest.len() > max_len {
      let mut cut = max_len;
      while !rest.is_char_boundary(cut) {
        cut -= 1;
      }
      if cut == 0 {
        cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
      }
      let (head, tail) = rest.split_at(cut);
      chunks.push(head.to_string());
      rest = tail;
    }
    current.push_str(rest);
  }

  if !current.is_empty() {
    chunks.push(current);
  }

  chunks
}
