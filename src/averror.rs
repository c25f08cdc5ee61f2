//! ffmpeg style status codes.
//!
//! Library calls report failures as negative integers: either a negated POSIX
//! errno, or a negated four character tag.

use libc::c_int;
use std::io;

/// Returns a negative error code from a POSIX error code.
pub const fn averror(errno: c_int) -> c_int {
  errno.wrapping_neg()
}

/// Returns the POSIX error code carried by a negative status.
pub const fn avunerror(status: c_int) -> c_int {
  status.wrapping_neg()
}

pub const fn mktag(a: u8, b: u8, c: u8, d: u8) -> u32 {
  (a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24)
}

pub const fn fferrtag(a: u8, b: u8, c: u8, d: u8) -> c_int {
  (mktag(a, b, c, d) as c_int).wrapping_neg()
}

pub const AVERROR_BSF_NOT_FOUND: c_int = fferrtag(0xF8, b'B', b'S', b'F');
pub const AVERROR_BUG: c_int = fferrtag(b'B', b'U', b'G', b'!');
pub const AVERROR_BUFFER_TOO_SMALL: c_int = fferrtag(b'B', b'U', b'F', b'S');
pub const AVERROR_DECODER_NOT_FOUND: c_int = fferrtag(0xF8, b'D', b'E', b'C');
pub const AVERROR_DEMUXER_NOT_FOUND: c_int = fferrtag(0xF8, b'D', b'E', b'M');
pub const AVERROR_ENCODER_NOT_FOUND: c_int = fferrtag(0xF8, b'E', b'N', b'C');
pub const AVERROR_EOF: c_int = fferrtag(b'E', b'O', b'F', b' ');
pub const AVERROR_EXIT: c_int = fferrtag(b'E', b'X', b'I', b'T');
pub const AVERROR_EXTERNAL: c_int = fferrtag(b'E', b'X', b'T', b' ');
pub const AVERROR_FILTER_NOT_FOUND: c_int = fferrtag(0xF8, b'F', b'I', b'L');
pub const AVERROR_INVALIDDATA: c_int = fferrtag(b'I', b'N', b'D', b'A');
pub const AVERROR_MUXER_NOT_FOUND: c_int = fferrtag(0xF8, b'M', b'U', b'X');
pub const AVERROR_OPTION_NOT_FOUND: c_int = fferrtag(0xF8, b'O', b'P', b'T');
pub const AVERROR_PATCHWELCOME: c_int = fferrtag(b'P', b'A', b'W', b'E');
pub const AVERROR_PROTOCOL_NOT_FOUND: c_int = fferrtag(0xF8, b'P', b'R', b'O');
pub const AVERROR_STREAM_NOT_FOUND: c_int = fferrtag(0xF8, b'S', b'T', b'R');
pub const AVERROR_UNKNOWN: c_int = fferrtag(b'U', b'N', b'K', b'N');

pub const AVERROR_EAGAIN: c_int = averror(libc::EAGAIN);
pub const AVERROR_EINVAL: c_int = averror(libc::EINVAL);
pub const AVERROR_ENOMEM: c_int = averror(libc::ENOMEM);

/// Message for the tagged codes, `None` for anything else.
pub fn tag_message(code: c_int) -> Option<&'static str> {
  let message = match code {
    AVERROR_BSF_NOT_FOUND => "Bitstream filter not found",
    AVERROR_BUG => "Internal bug, should not have happened",
    AVERROR_BUFFER_TOO_SMALL => "Buffer too small",
    AVERROR_DECODER_NOT_FOUND => "Decoder not found",
    AVERROR_DEMUXER_NOT_FOUND => "Demuxer not found",
    AVERROR_ENCODER_NOT_FOUND => "Encoder not found",
    AVERROR_EOF => "End of file",
    AVERROR_EXIT => "Immediate exit requested",
    AVERROR_EXTERNAL => "Generic error in an external library",
    AVERROR_FILTER_NOT_FOUND => "Filter not found",
    AVERROR_INVALIDDATA => "Invalid data found when processing input",
    AVERROR_MUXER_NOT_FOUND => "Muxer not found",
    AVERROR_OPTION_NOT_FOUND => "Option not found",
    AVERROR_PATCHWELCOME => "Not yet implemented in FFmpeg, patches welcome",
    AVERROR_PROTOCOL_NOT_FOUND => "Protocol not found",
    AVERROR_STREAM_NOT_FOUND => "Stream not found",
    AVERROR_UNKNOWN => "Unknown error occurred",
    _ => return None,
  };
  Some(message)
}

/// Human readable description of a negative status.
///
/// Tagged codes use their fixed message, negated errno values are described
/// by the operating system.
pub fn describe(code: c_int) -> String {
  if let Some(message) = tag_message(code) {
    return message.to_string();
  }
  if code < 0 && code != c_int::MIN {
    return strerror(avunerror(code));
  }
  format!("Error number {code} occurred")
}

// io::Error appends " (os error N)", strerror text does not
fn strerror(errno: c_int) -> String {
  let message = io::Error::from_raw_os_error(errno).to_string();
  let suffix = format!(" (os error {errno})");
  match message.strip_suffix(&suffix) {
    Some(text) => text.to_string(),
    None => message,
  }
}

#[test]
fn errno_round_trip() {
  assert_eq!(averror(libc::EINVAL), -libc::EINVAL);
  assert_eq!(avunerror(AVERROR_EINVAL), libc::EINVAL);
}

#[test]
fn tags_match_ffmpeg_values() {
  assert_eq!(AVERROR_EOF, -0x2046_4f45);
  assert_eq!(AVERROR_INVALIDDATA, -0x4144_4e49);
  assert!(AVERROR_BUG < 0);
}

#[test]
fn describe_known_codes() {
  assert_eq!(describe(AVERROR_EOF), "End of file");
  assert_eq!(
    describe(AVERROR_DECODER_NOT_FOUND),
    "Decoder not found"
  );
  let out_of_memory = describe(AVERROR_ENOMEM);
  assert!(!out_of_memory.is_empty());
  assert!(!out_of_memory.contains("os error"));
  assert!(std::io::Error::from_raw_os_error(libc::ENOMEM)
    .to_string()
    .starts_with(&out_of_memory));
  assert_eq!(describe(42), "Error number 42 occurred");
}

#[test]
fn extreme_codes_do_not_overflow() {
  assert_eq!(avunerror(c_int::MIN), c_int::MIN);
  assert_eq!(averror(c_int::MIN), c_int::MIN);
  assert_eq!(fferrtag(0, 0, 0, 0x80), c_int::MIN);
  assert_eq!(
    describe(c_int::MIN),
    format!("Error number {} occurred", c_int::MIN)
  );
  assert!(!describe(c_int::MIN + 1).is_empty());
}
